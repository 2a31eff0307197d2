//! Group comparison of recall accuracy by self-reported play experience.

pub mod analysis;
pub mod data;
pub mod error;
pub mod groups;
pub mod report;
pub mod special;
pub mod stats;
pub mod tukey;
pub mod workbook;

pub use analysis::{ALPHA, Analysis, GroupSample, TestEntry, significance_symbol};
pub use data::{Columns, Dataset, EXPERIENCE_COLUMN, TARGET_QUESTIONS};
pub use error::AnalysisError;
pub use groups::{ExperienceGroup, Participant, accuracy, participants};
pub use stats::StatsError;
pub use workbook::{DEFAULT_SHEET, load_workbook};
