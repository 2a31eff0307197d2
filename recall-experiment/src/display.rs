use std::path::{Path, PathBuf};
use std::time::Duration;

use recall_core::{Key, Screen};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("cannot show stimulus {path}: {message}")]
    ImageLoad { path: PathBuf, message: String },
    #[error("presentation failed: {0}")]
    Present(String),
}

/// The window an experiment draws into.
///
/// Onsets are nanoseconds on the same clock as the session [`Timer`], taken
/// right after the frame was handed to the compositor.
///
/// [`Timer`]: recall_timing::Timer
pub trait Display {
    fn present(&mut self, screen: &Screen<'_>) -> Result<u64, DisplayError>;

    /// Waits at most `timeout` and returns the keys pressed meanwhile, in
    /// order. A zero timeout only drains pending input.
    fn poll_keys(&mut self, timeout: Duration) -> Vec<Key>;

    /// Decodes `image` ahead of its stimulus frame so that presenting it
    /// costs no decode time.
    fn preload(&mut self, _image: &Path) -> Result<(), DisplayError> {
        Ok(())
    }

    /// True once after the window lost its contents (expose, resize) since
    /// the last call. The current screen must then be presented again.
    fn take_redraw(&mut self) -> bool {
        false
    }
}

impl<D: Display + ?Sized> Display for &mut D {
    fn present(&mut self, screen: &Screen<'_>) -> Result<u64, DisplayError> {
        (**self).present(screen)
    }

    fn poll_keys(&mut self, timeout: Duration) -> Vec<Key> {
        (**self).poll_keys(timeout)
    }

    fn preload(&mut self, image: &Path) -> Result<(), DisplayError> {
        (**self).preload(image)
    }

    fn take_redraw(&mut self) -> bool {
        (**self).take_redraw()
    }
}
