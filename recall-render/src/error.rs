use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a usable font")]
    FontParse(PathBuf),
    #[error("no font found; set display.font_path (tried {0})")]
    NoFont(String),
    #[error("cannot allocate a {0}x{1} canvas")]
    Canvas(u32, u32),
    #[error("failed to write png {path}: {message}")]
    Png { path: PathBuf, message: String },
}
