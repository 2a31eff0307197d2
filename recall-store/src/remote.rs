use tracing::info;

use crate::SinkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetId(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetId {
    pub spreadsheet: SpreadsheetId,
    pub title: String,
}

/// Access to a hosted spreadsheet service.
pub trait SpreadsheetClient {
    fn open_or_create_spreadsheet(&mut self, name: &str) -> Result<SpreadsheetId, SinkError>;

    fn open_or_create_worksheet(
        &mut self,
        spreadsheet: &SpreadsheetId,
        title: &str,
    ) -> Result<WorksheetId, SinkError>;

    fn read_all_rows(&self, sheet: &WorksheetId) -> Result<Vec<Vec<String>>, SinkError>;

    fn append_row(&mut self, sheet: &WorksheetId, row: &[String]) -> Result<(), SinkError>;

    /// Where a person can open the spreadsheet.
    fn location(&self, spreadsheet: &SpreadsheetId) -> String;
}

/// Appends participant rows to one worksheet, adding the header the first
/// time the sheet is written.
pub struct RemoteSink {
    client: Box<dyn SpreadsheetClient>,
    spreadsheet: String,
    worksheet: String,
}

impl RemoteSink {
    pub fn new(
        client: Box<dyn SpreadsheetClient>,
        spreadsheet: impl Into<String>,
        worksheet: impl Into<String>,
    ) -> Self {
        Self {
            client,
            spreadsheet: spreadsheet.into(),
            worksheet: worksheet.into(),
        }
    }

    pub fn write(&mut self, header: &[String], row: &[String]) -> Result<String, SinkError> {
        let spreadsheet = self.client.open_or_create_spreadsheet(&self.spreadsheet)?;
        let sheet = self
            .client
            .open_or_create_worksheet(&spreadsheet, &self.worksheet)?;

        let existing = self.client.read_all_rows(&sheet)?;
        if needs_header(&existing) {
            self.client.append_row(&sheet, header)?;
        }
        self.client.append_row(&sheet, row)?;

        let location = self.client.location(&spreadsheet);
        info!(spreadsheet = %self.spreadsheet, worksheet = %self.worksheet, %location, "row appended");
        Ok(location)
    }
}

/// A sheet gets a header when it is empty or its first row is blank.
fn needs_header(rows: &[Vec<String>]) -> bool {
    rows.first()
        .is_none_or(|first| first.iter().all(|cell| cell.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_needed_only_for_empty_sheets() {
        assert!(needs_header(&[]));
        assert!(needs_header(&[vec![]]));
        assert!(needs_header(&[vec![String::new(), String::new()]]));
        assert!(!needs_header(&[vec!["参加者名".to_string()]]));
    }
}
