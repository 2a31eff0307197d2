//! Loading and cleaning the merged results table.

use std::fs;
use std::path::Path;

use recall_store::{PARTICIPANT_COLUMN, table};
use tracing::{debug, info, warn};

use crate::AnalysisError;

/// Spreadsheet marker for the columns holding per-question correctness.
pub const CORRECT_MARKER: &str = "正答";

/// Questions whose correctness columns feed the accuracy rate.
pub const TARGET_QUESTIONS: &[&str] = &["Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Q7", "Q8", "Q17", "Q18"];

pub const EXPERIENCE_COLUMN: &str = "Valorantのプレイ経験はありますか。";

/// Participant cells marking rows that are not participants.
const PLACEHOLDER_NAMES: &[&str] = &["", "ー", CORRECT_MARKER];

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path).map_err(|source| AnalysisError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::parse(&text).map_err(|e| match e {
            ParseFailure::Table(source) => AnalysisError::Table {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Empty => AnalysisError::Empty(path.to_path_buf()),
        })?;
        info!(
            path = %path.display(),
            rows = dataset.rows.len(),
            columns = dataset.headers.len(),
            "loaded results table"
        );
        Ok(dataset)
    }

    pub fn parse(text: &str) -> Result<Self, ParseFailure> {
        let records = table::parse(text).map_err(ParseFailure::Table)?;
        Self::from_records(records).ok_or(ParseFailure::Empty)
    }

    /// First record is the header row; `None` when there is none.
    pub fn from_records(records: Vec<Vec<String>>) -> Option<Self> {
        let mut records = records.into_iter();
        let headers = records
            .next()?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        Some(Self {
            headers,
            rows: records.collect(),
        })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require(&self, name: &str) -> Result<usize, AnalysisError> {
        self.column(name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    /// Trimmed cell; short rows read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map_or("", |c| c.trim())
    }

    /// Drops rows whose participant cell is empty or a placeholder.
    pub fn clean(&mut self, participant: usize) {
        let before = self.rows.len();
        self.rows.retain(|row| {
            let name = row.get(participant).map_or("", |c| c.trim());
            !PLACEHOLDER_NAMES.contains(&name)
        });
        debug!(dropped = before - self.rows.len(), "cleaned rows");
    }

    /// Correctness columns for the given question tags, in tag order.
    ///
    /// Columns are matched by leading tag first. Only when no tag matches
    /// that way are marked columns mentioning a tag anywhere accepted.
    pub fn correct_columns(&self, tags: &[&str]) -> Vec<usize> {
        let marked = |h: &str| h.contains(CORRECT_MARKER);
        let mut found = Vec::new();
        for tag in tags {
            match self
                .headers
                .iter()
                .position(|h| marked(h) && h.starts_with(tag) && tag_ends_at(h, tag))
            {
                Some(i) => {
                    debug!(tag, column = %self.headers[i], "correct column");
                    push_unique(&mut found, i);
                }
                None => warn!(tag, "no correct column"),
            }
        }
        if found.is_empty() {
            for tag in tags {
                let hits = self
                    .headers
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| marked(h) && mentions_tag(h, tag));
                for (i, h) in hits {
                    debug!(tag, column = %h, "fallback correct column");
                    push_unique(&mut found, i);
                }
            }
        }
        found
    }
}

fn push_unique(found: &mut Vec<usize>, column: usize) {
    if !found.contains(&column) {
        found.push(column);
    }
}

/// Any occurrence of `tag` not followed by a digit.
fn mentions_tag(header: &str, tag: &str) -> bool {
    header
        .match_indices(tag)
        .any(|(at, _)| !header[at + tag.len()..].starts_with(|c: char| c.is_ascii_digit()))
}

/// `Q1` must not match `Q17`.
fn tag_ends_at(header: &str, tag: &str) -> bool {
    !header[tag.len()..].starts_with(|c: char| c.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    Table(recall_store::TableError),
    Empty,
}

/// Column indices the pipeline reads.
#[derive(Debug, Clone, Copy)]
pub struct Columns {
    pub participant: usize,
    pub experience: usize,
}

impl Columns {
    pub fn find(data: &Dataset, participant: &str, experience: &str) -> Result<Self, AnalysisError> {
        Ok(Self {
            participant: data.require(participant)?,
            experience: data.require(experience)?,
        })
    }

    pub fn defaults(data: &Dataset) -> Result<Self, AnalysisError> {
        Self::find(data, PARTICIPANT_COLUMN, EXPERIENCE_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::parse(
            "参加者名,Q1: answer,Q1 正答,Q17 正答,Q2: 正答,其他 Q3 正答\n\
             alice,x,TRUE,FALSE,1,T\n\
             ー,,,,,\n\
             正答,,,,,\n\
             ,,,,,\n\
             bob,y,FALSE\n",
        )
        .unwrap()
    }

    #[test]
    fn clean_drops_placeholder_rows() {
        let mut data = sample();
        data.clean(0);
        let names: Vec<&str> = (0..data.rows.len()).map(|r| data.cell(r, 0)).collect();
        assert_eq!(names, ["alice", "bob"]);
    }

    #[test]
    fn correct_columns_match_leading_tags_then_fall_back() {
        let data = sample();
        assert_eq!(data.correct_columns(&["Q1"]), [2]);
        assert_eq!(data.correct_columns(&["Q17"]), [3]);
        assert_eq!(data.correct_columns(&["Q2"]), [4]);
        assert_eq!(data.correct_columns(&["Q3"]), [5]);
        assert!(data.correct_columns(&["Q9"]).is_empty());
    }

    #[test]
    fn fallback_only_applies_when_no_tag_leads_a_column() {
        let data = sample();
        assert_eq!(data.correct_columns(&["Q1", "Q3"]), [2]);
    }

    #[test]
    fn shorter_tag_does_not_claim_a_longer_column() {
        let data = Dataset::parse("参加者名,Q17 正答\nalice,TRUE\n").unwrap();
        assert_eq!(data.correct_columns(&["Q1", "Q17"]), [1]);
        assert!(data.correct_columns(&["Q1"]).is_empty());
    }

    #[test]
    fn short_rows_read_as_empty() {
        let mut data = sample();
        data.clean(0);
        assert_eq!(data.cell(1, 4), "");
    }

    #[test]
    fn missing_column_is_an_error() {
        let data = sample();
        assert!(matches!(
            Columns::defaults(&data),
            Err(AnalysisError::MissingColumn(c)) if c == EXPERIENCE_COLUMN
        ));
    }

    #[test]
    fn empty_document_has_no_header() {
        assert_eq!(Dataset::parse(""), Err(ParseFailure::Empty));
    }
}
