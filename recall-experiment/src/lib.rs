pub mod config;
pub mod display;
pub mod error;
pub mod gate;
pub mod question;
pub mod session;
pub mod trial;

pub use config::{
    ConfigError, DisplayConfig, DisplayStrings, ExperimentConfig, ExperimentInfo, OutputConfig,
    TimingConfig, WorkbookConfig, fill,
};
pub use display::{Display, DisplayError};
pub use error::ExperimentError;
pub use question::{MultiChoice, Outcome, QuestionInterface, QuestionState, SingleChoice, TextEntry};
pub use session::{Session, SessionOutcome, save_status_text};
pub use trial::run_trial;
