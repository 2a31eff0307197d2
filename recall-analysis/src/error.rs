use std::io;
use std::path::PathBuf;

use recall_render::RenderError;
use recall_store::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed table {path}: {source}")]
    Table { path: PathBuf, source: TableError },
    #[error("failed to read workbook {path}: {source}")]
    Workbook { path: PathBuf, source: calamine::Error },
    #[error("{0} has no header row")]
    Empty(PathBuf),
    #[error("column `{0}` not found")]
    MissingColumn(String),
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode the report: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}
