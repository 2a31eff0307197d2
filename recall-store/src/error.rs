use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableError {
    #[error("unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no remote sink configured")]
    Disabled,
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },
    #[error("spreadsheet client: {0}")]
    Client(String),
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> SinkError {
        let path = path.into();
        move |source| SinkError::Io { path, source }
    }
}
