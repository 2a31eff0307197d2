use crate::task::Task;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A task scheduled at a fixed position in the session.
#[derive(Debug, Clone, Copy)]
pub struct Trial<'a> {
    pub number: usize,
    pub task: &'a Task,
}

/// One trial per task, numbered from 1, in configuration order.
pub fn trial_list(tasks: &[Task]) -> Vec<Trial<'_>> {
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| Trial {
            number: i + 1,
            task,
        })
        .collect()
}

/// Flip timestamps in nanoseconds on the session timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Onsets {
    pub fixation_ns: u64,
    pub stimulus_ns: u64,
    pub blackout_ns: u64,
}

impl Onsets {
    /// Measured stimulus-to-blackout interval.
    pub fn stimulus_duration(&self) -> Duration {
        Duration::from_nanos(self.blackout_ns.saturating_sub(self.stimulus_ns))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_number: usize,
    pub image: PathBuf,
    pub onsets: Onsets,
    pub stimulus_duration_actual: Duration,
    pub answers: Vec<Answer>,
    pub participant: String,
    pub timestamp: DateTime<Local>,
}

impl TrialResult {
    pub fn answer(&self, label: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.value.as_str())
    }
}
