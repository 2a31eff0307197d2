pub mod columns;
pub mod error;
pub mod local;
pub mod manager;
pub mod remote;
pub mod table;
pub mod workbook;

pub use columns::{Column, PARTICIPANT_COLUMN, TIMESTAMP_COLUMN, header_row, participant_row, question_columns};
pub use error::{SinkError, TableError};
pub use local::LocalCsvSink;
pub use manager::{DataManager, SaveReport};
pub use remote::{RemoteSink, SpreadsheetClient, SpreadsheetId, WorksheetId};
pub use workbook::Workbook;
