use std::path::PathBuf;

use chrono::{DateTime, Local};
use recall_core::{ParticipantInfo, Task, TrialResult};
use tracing::{error, warn};

use crate::columns::{Column, header_row, participant_row, question_columns};
use crate::{LocalCsvSink, RemoteSink, SinkError};

/// Outcome of both sinks. Neither result depends on the other.
#[derive(Debug)]
pub struct SaveReport {
    /// Spreadsheet location on success.
    pub remote: Result<String, SinkError>,
    pub local: Result<PathBuf, SinkError>,
}

impl SaveReport {
    pub fn any_saved(&self) -> bool {
        self.remote.is_ok() || self.local.is_ok()
    }
}

pub struct DataManager {
    columns: Vec<Column>,
    local: LocalCsvSink,
    remote: Option<RemoteSink>,
}

impl DataManager {
    pub fn new(tasks: &[Task], local: LocalCsvSink) -> Self {
        Self {
            columns: question_columns(tasks),
            local,
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: RemoteSink) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Tries the remote sink, then the local one, regardless of the first
    /// outcome.
    pub fn save(
        &mut self,
        participant: &ParticipantInfo,
        results: &[TrialResult],
        now: DateTime<Local>,
    ) -> SaveReport {
        let header = header_row(&self.columns);
        let row = participant_row(&self.columns, results, &participant.name, &now);

        let remote = match self.remote.as_mut() {
            Some(sink) => sink.write(&header, &row),
            None => Err(SinkError::Disabled),
        };
        match &remote {
            Err(SinkError::Disabled) => warn!("remote sink disabled, skipping upload"),
            Err(e) => error!(error = %e, "remote save failed"),
            Ok(_) => {}
        }

        let local = self.local.write(&header, &row, &participant.name, &now);
        if let Err(e) = &local {
            error!(error = %e, "local save failed");
        }

        SaveReport { remote, local }
    }
}
