use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::remote::{SpreadsheetClient, SpreadsheetId, WorksheetId};
use crate::{SinkError, table};

/// File-backed spreadsheet service: each spreadsheet is a directory under
/// `root`, each worksheet a CSV file inside it.
#[derive(Debug, Clone)]
pub struct Workbook {
    root: PathBuf,
}

impl Workbook {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn spreadsheet_dir(&self, id: &SpreadsheetId) -> PathBuf {
        self.root.join(file_stem(&id.0))
    }

    fn worksheet_path(&self, sheet: &WorksheetId) -> PathBuf {
        self.spreadsheet_dir(&sheet.spreadsheet)
            .join(format!("{}.csv", file_stem(&sheet.title)))
    }
}

/// Names may contain anything; path separators are not allowed on disk.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

impl SpreadsheetClient for Workbook {
    fn open_or_create_spreadsheet(&mut self, name: &str) -> Result<SpreadsheetId, SinkError> {
        let id = SpreadsheetId(name.to_string());
        let dir = self.spreadsheet_dir(&id);
        fs::create_dir_all(&dir).map_err(SinkError::io(&dir))?;
        Ok(id)
    }

    fn open_or_create_worksheet(
        &mut self,
        spreadsheet: &SpreadsheetId,
        title: &str,
    ) -> Result<WorksheetId, SinkError> {
        let sheet = WorksheetId {
            spreadsheet: spreadsheet.clone(),
            title: title.to_string(),
        };
        let path = self.worksheet_path(&sheet);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(SinkError::io(&path))?;
        Ok(sheet)
    }

    fn read_all_rows(&self, sheet: &WorksheetId) -> Result<Vec<Vec<String>>, SinkError> {
        let path = self.worksheet_path(sheet);
        let text = fs::read_to_string(&path).map_err(SinkError::io(&path))?;
        table::parse(&text).map_err(|source| SinkError::Table { path, source })
    }

    fn append_row(&mut self, sheet: &WorksheetId, row: &[String]) -> Result<(), SinkError> {
        let path = self.worksheet_path(sheet);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(SinkError::io(&path))?;
        file.write_all(table::encode_row(row).as_bytes())
            .map_err(SinkError::io(&path))
    }

    fn location(&self, spreadsheet: &SpreadsheetId) -> String {
        self.spreadsheet_dir(spreadsheet).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_round_trip_through_the_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let mut book = Workbook::new(dir.path());
        let id = book.open_or_create_spreadsheet("recall/pilot").unwrap();
        let sheet = book.open_or_create_worksheet(&id, "Sheet1").unwrap();
        assert!(book.read_all_rows(&sheet).unwrap().is_empty());

        book.append_row(&sheet, &["a".into(), "b, c".into()]).unwrap();
        assert_eq!(
            book.read_all_rows(&sheet).unwrap(),
            vec![vec!["a".to_string(), "b, c".to_string()]]
        );
        assert!(dir.path().join("recall_pilot").join("Sheet1.csv").is_file());
        assert_eq!(book.location(&id), dir.path().join("recall_pilot").display().to_string());
    }
}
