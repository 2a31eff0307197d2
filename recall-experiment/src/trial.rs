use chrono::Local;
use recall_core::{Backdrop, Onsets, Screen, Trial, TrialResult};
use recall_timing::Timer;
use tracing::{info, warn};

use crate::gate::check_escape;
use crate::question::QuestionInterface;
use crate::{Display, DisplayError, ExperimentConfig, ExperimentError};

use std::time::Duration;

/// Runs one trial: clear, fixation, stimulus, blackout, then questions.
///
/// The stimulus is decoded while the fixation cross is up. Returns
/// `Ok(None)` when it cannot be loaded; the trial is then skipped without
/// asking its questions.
pub fn run_trial<D: Display, T: Timer>(
    display: &mut D,
    timer: &T,
    config: &ExperimentConfig,
    trial: &Trial<'_>,
    participant: &str,
) -> Result<Option<TrialResult>, ExperimentError> {
    check_escape(&display.poll_keys(Duration::ZERO))?;
    let timing = &config.timing;

    display.present(&Screen::Blank(Backdrop::Black))?;
    timer.sleep(timing.clear());

    display.present(&Screen::Blank(Backdrop::Grey))?;
    timer.sleep(timing.fixation_grey());
    let fixation_ns = display.present(&Screen::Fixation)?;
    let image = trial.task.image();
    let decode_start = timer.now();
    if let Err(e) = display.preload(image) {
        return skip_unloadable(trial, e);
    }
    timer.sleep(timing.fixation().saturating_sub(timer.elapsed(decode_start)));

    let stimulus_ns = match display.present(&Screen::Stimulus(image)) {
        Ok(onset) => onset,
        Err(e) => return skip_unloadable(trial, e),
    };
    timer.sleep(timing.stimulus());

    let blackout_ns = display.present(&Screen::Blank(Backdrop::Black))?;
    timer.sleep(timing.blackout());

    let onsets = Onsets {
        fixation_ns,
        stimulus_ns,
        blackout_ns,
    };
    let actual = onsets.stimulus_duration();
    info!(
        trial = trial.number,
        image = %image.display(),
        target_ms = timing.stimulus().as_secs_f64() * 1e3,
        actual_ms = actual.as_secs_f64() * 1e3,
        "stimulus presented"
    );

    let answers = QuestionInterface::new(config).ask_all(display, &trial.task.questions)?;

    Ok(Some(TrialResult {
        trial_number: trial.number,
        image: image.to_path_buf(),
        onsets,
        stimulus_duration_actual: actual,
        answers,
        participant: participant.to_string(),
        timestamp: Local::now(),
    }))
}

fn skip_unloadable(
    trial: &Trial<'_>,
    error: DisplayError,
) -> Result<Option<TrialResult>, ExperimentError> {
    match error {
        DisplayError::ImageLoad { path, message } => {
            warn!(trial = trial.number, path = %path.display(), %message, "stimulus failed to load, skipping trial");
            Ok(None)
        }
        e => Err(e.into()),
    }
}
