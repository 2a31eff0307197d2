use std::time::Duration;

use recall_core::{Key, Screen};

use crate::{Display, ExperimentError};

/// Fails with [`ExperimentError::Aborted`] if escape is anywhere in `keys`.
pub fn check_escape(keys: &[Key]) -> Result<(), ExperimentError> {
    if keys.contains(&Key::Escape) {
        return Err(ExperimentError::Aborted);
    }
    Ok(())
}

/// Shows `screen` and blocks until space is pressed, presenting it again
/// whenever the display asks for a redraw.
pub fn wait_for_space<D: Display>(
    display: &mut D,
    screen: &Screen<'_>,
    poll: Duration,
) -> Result<(), ExperimentError> {
    display.present(screen)?;
    loop {
        let keys = display.poll_keys(poll);
        check_escape(&keys)?;
        if keys.contains(&Key::Space) {
            return Ok(());
        }
        if display.take_redraw() {
            display.present(screen)?;
        }
    }
}
