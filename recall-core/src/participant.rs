use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub name: String,
}

impl ParticipantInfo {
    /// Trimmed name, or `None` when blank.
    pub fn named(name: &str) -> Option<Self> {
        let name = name.trim();
        (!name.is_empty()).then(|| Self {
            name: name.to_string(),
        })
    }

    pub fn generated(at: DateTime<Local>) -> Self {
        Self {
            name: format!("Participant_{}", at.format("%Y%m%d_%H%M%S")),
        }
    }
}
