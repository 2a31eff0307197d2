//! Reading the results table straight from the researcher's workbook.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use tracing::{debug, info, warn};

use crate::{AnalysisError, Dataset};

/// Sheet holding the merged results in the shared workbook.
pub const DEFAULT_SHEET: &str = "Valorant用";

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| WORKBOOK_EXTENSIONS.iter().any(|w| e.eq_ignore_ascii_case(w)))
}

/// The preferred sheet if present, otherwise the first one.
pub fn pick_sheet<'a>(names: &'a [String], preferred: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|n| n.as_str() == preferred)
        .or_else(|| names.first())
        .map(String::as_str)
}

/// Loads `sheet` (or the first sheet when it is missing) as a dataset.
pub fn load_workbook(path: &Path, sheet: &str) -> Result<Dataset, AnalysisError> {
    let workbook_error = |source| AnalysisError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let names = workbook.sheet_names();
    debug!(sheets = ?names, "workbook sheets");
    let chosen = pick_sheet(&names, sheet)
        .ok_or_else(|| AnalysisError::Empty(path.to_path_buf()))?
        .to_string();
    if chosen != sheet {
        warn!(wanted = sheet, using = %chosen, "sheet not found, using the first sheet");
    }

    let range = workbook.worksheet_range(&chosen).map_err(workbook_error)?;
    let dataset = Dataset::from_records(rows_of(&range))
        .ok_or_else(|| AnalysisError::Empty(path.to_path_buf()))?;
    info!(
        path = %path.display(),
        sheet = %chosen,
        rows = dataset.rows.len(),
        columns = dataset.headers.len(),
        "loaded results sheet"
    );
    Ok(dataset)
}

/// Cells as the text a CSV export of the sheet would hold.
fn rows_of(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}
