use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::SinkError;
use crate::table;

/// Writes one CSV per participant into a directory.
#[derive(Debug, Clone)]
pub struct LocalCsvSink {
    dir: PathBuf,
}

impl LocalCsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<participant>_<YYYYmmdd_HHMMSS>.csv`
    pub fn file_name(participant: &str, time: &DateTime<Local>) -> String {
        format!("{participant}_{}.csv", time.format("%Y%m%d_%H%M%S"))
    }

    /// Header plus one row, UTF-8 with a byte-order mark so spreadsheet
    /// programs pick the right encoding.
    pub fn write(
        &self,
        header: &[String],
        row: &[String],
        participant: &str,
        time: &DateTime<Local>,
    ) -> Result<PathBuf, SinkError> {
        fs::create_dir_all(&self.dir).map_err(SinkError::io(&self.dir))?;
        let path = self.dir.join(Self::file_name(participant, time));
        let contents = table::encode(&[header.to_vec(), row.to_vec()], true);
        fs::write(&path, contents).map_err(SinkError::io(&path))?;
        info!(path = %path.display(), "local backup written");
        Ok(path)
    }
}
