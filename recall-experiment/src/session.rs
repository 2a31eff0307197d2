use recall_core::{Game, GameTracker, ParticipantInfo, Screen, Tone, TrialResult, trial_list};
use recall_store::SaveReport;
use recall_timing::{DurationStats, Timer};
use tracing::{info, warn};

use crate::config::{DisplayStrings, fill};
use crate::gate::wait_for_space;
use crate::trial::run_trial;
use crate::{Display, ExperimentConfig, ExperimentError};

/// What a completed session hands back for saving.
#[derive(Debug)]
pub struct SessionOutcome {
    pub results: Vec<TrialResult>,
    /// Realized stimulus durations; `None` when every trial was skipped.
    pub timing: Option<DurationStats>,
    /// Games announced, in order.
    pub transitions: Vec<Game>,
}

/// Drives the fixed task sequence for one participant.
pub struct Session<'c, D: Display, T: Timer> {
    config: &'c ExperimentConfig,
    display: D,
    timer: T,
    participant: ParticipantInfo,
}

impl<'c, D: Display, T: Timer> Session<'c, D, T> {
    pub fn new(
        config: &'c ExperimentConfig,
        display: D,
        timer: T,
        participant: ParticipantInfo,
    ) -> Self {
        Self {
            config,
            display,
            timer,
            participant,
        }
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_display(self) -> D {
        self.display
    }

    fn strings(&self) -> &'c DisplayStrings {
        &self.config.strings
    }

    fn gate(&mut self, text: &str, tone: Tone) -> Result<(), ExperimentError> {
        let poll = self.config.timing.poll_interval();
        wait_for_space(&mut self.display, &Screen::Message { text, tone }, poll)
    }

    pub fn run(&mut self) -> Result<SessionOutcome, ExperimentError> {
        let config = self.config;
        let trials = trial_list(&config.tasks);
        let total = trials.len().to_string();
        info!(participant = %self.participant.name, tasks = trials.len(), "session started");

        let welcome = fill(
            &self.strings().welcome,
            &[("name", config.experiment.name.as_str()), ("total", total.as_str())],
        );
        self.gate(&welcome, Tone::Welcome)?;

        let mut games = GameTracker::new();
        let mut transitions = Vec::new();
        let mut results = Vec::with_capacity(trials.len());

        for (i, trial) in trials.iter().enumerate() {
            if let Some(game) = games.observe(trial.task.image()) {
                info!(game = game.display_name(), trial = trial.number, "game transition");
                let text = fill(&self.strings().transition, &[("game", game.display_name())]);
                self.gate(&text, Tone::Transition)?;
                transitions.push(game);
            }

            if i > 0 {
                let current = trial.number.to_string();
                let text = fill(
                    &self.strings().progress,
                    &[("current", current.as_str()), ("total", total.as_str())],
                );
                self.gate(&text, Tone::Notice)?;
            } else {
                self.countdown()?;
            }

            match run_trial(
                &mut self.display,
                &self.timer,
                config,
                trial,
                &self.participant.name,
            )? {
                Some(result) => results.push(result),
                None => warn!(trial = trial.number, "trial produced no result"),
            }
        }

        self.gate(&self.strings().end, Tone::Notice)?;

        let durations: Vec<_> = results.iter().map(|r| r.stimulus_duration_actual).collect();
        let timing = DurationStats::from_samples(&durations);
        if let Some(stats) = &timing {
            let target = config.timing.stimulus();
            info!(
                samples = stats.samples,
                mean_ms = stats.mean.as_secs_f64() * 1e3,
                min_ms = stats.min.as_secs_f64() * 1e3,
                max_ms = stats.max.as_secs_f64() * 1e3,
                target_ms = target.as_secs_f64() * 1e3,
                mean_error_ms = stats.mean_error_ms(target),
                "stimulus timing"
            );
        }
        info!(completed = results.len(), "session finished");

        Ok(SessionOutcome {
            results,
            timing,
            transitions,
        })
    }

    fn countdown(&mut self) -> Result<(), ExperimentError> {
        let step = self.config.timing.countdown_step();
        for count in &self.config.timing.countdown {
            let text = count.to_string();
            self.display.present(&Screen::Message {
                text: &text,
                tone: Tone::Countdown,
            })?;
            self.timer.sleep(step);
        }
        Ok(())
    }

    /// Shows how each sink fared and waits for space.
    pub fn show_save_report(&mut self, report: &SaveReport) -> Result<(), ExperimentError> {
        let text = save_status_text(report, self.strings());
        self.gate(&text, Tone::Status)
    }
}

pub fn save_status_text(report: &SaveReport, strings: &DisplayStrings) -> String {
    let mut text = format!("{}\n\n", strings.save_title);
    match &report.remote {
        Ok(location) => {
            text.push_str(&strings.remote_saved);
            text.push('\n');
            text.push_str(&fill(&strings.remote_location, &[("location", location.as_str())]));
            text.push_str("\n\n");
        }
        Err(_) => {
            text.push_str(&strings.remote_failed);
            text.push_str("\n\n");
        }
    }
    match &report.local {
        Ok(path) => {
            let path = path.display().to_string();
            text.push_str(&fill(&strings.local_saved, &[("path", path.as_str())]));
        }
        Err(_) => text.push_str(&strings.local_failed),
    }
    text.push_str("\n\n");
    text.push_str(&strings.save_footer);
    text
}
