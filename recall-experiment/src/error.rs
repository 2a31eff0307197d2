use thiserror::Error;

use crate::display::DisplayError;

#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Escape or window close at any point that waits for input.
    #[error("session aborted by participant")]
    Aborted,
    #[error(transparent)]
    Display(#[from] DisplayError),
}
