pub mod game;
pub mod key;
pub mod participant;
pub mod screen;
pub mod task;
pub mod trial;

pub use game::{Game, GameTracker};
pub use key::Key;
pub use participant::ParticipantInfo;
pub use screen::{Backdrop, DisplayMode, Screen, Tone};
pub use task::{ModelError, Question, QuestionKind, QuestionSpec, Task};
pub use trial::{Answer, Onsets, Trial, TrialResult, trial_list};
