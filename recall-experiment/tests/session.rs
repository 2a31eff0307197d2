use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use recall_core::{Backdrop, Game, Key, ParticipantInfo, Question, Screen, Task, Tone};
use recall_experiment::{Display, DisplayError, ExperimentConfig, ExperimentError, Session};
use recall_timing::{ManualTimer, Timer};

#[derive(Debug, Clone, PartialEq)]
enum Shown {
    Blank(Backdrop),
    Fixation,
    Preload(PathBuf),
    Stimulus(PathBuf),
    Message(String, Tone),
    Question(String),
}

/// Acknowledges every gate with space and feeds scripted key batches to
/// question screens. Runs out of script by pressing escape. An empty batch
/// stands for the window losing its contents.
struct ScriptedDisplay {
    timer: ManualTimer,
    batches: VecDeque<Vec<Key>>,
    pending: Vec<Key>,
    broken_images: Vec<PathBuf>,
    blackout_latency: Duration,
    decode_latency: Duration,
    gate_redraws: usize,
    redraw: bool,
    shown: Vec<Shown>,
}

impl ScriptedDisplay {
    fn new(timer: ManualTimer, keys: &[&str]) -> Self {
        Self {
            timer,
            batches: keys.iter().map(|k| vec![k.parse().unwrap()]).collect(),
            pending: Vec::new(),
            broken_images: Vec::new(),
            blackout_latency: Duration::ZERO,
            decode_latency: Duration::ZERO,
            gate_redraws: 0,
            redraw: false,
            shown: Vec::new(),
        }
    }

    fn messages(&self, tone: Tone) -> Vec<&str> {
        self.shown
            .iter()
            .filter_map(|s| match s {
                Shown::Message(text, t) if *t == tone => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, wanted: &Shown) -> usize {
        self.shown.iter().filter(|s| *s == wanted).count()
    }

    fn is_broken(&self, path: &Path) -> bool {
        self.broken_images.iter().any(|p| p == path)
    }

    fn image_error(path: &Path) -> DisplayError {
        DisplayError::ImageLoad {
            path: path.to_path_buf(),
            message: "unsupported format".into(),
        }
    }
}

impl Display for ScriptedDisplay {
    fn present(&mut self, screen: &Screen<'_>) -> Result<u64, DisplayError> {
        let shown = match *screen {
            Screen::Blank(backdrop) => Shown::Blank(backdrop),
            Screen::Fixation => Shown::Fixation,
            Screen::Stimulus(path) => {
                if self.is_broken(path) {
                    return Err(Self::image_error(path));
                }
                Shown::Stimulus(path.to_path_buf())
            }
            Screen::Message { text, tone } => Shown::Message(text.to_string(), tone),
            Screen::Question { text, .. } => Shown::Question(text.to_string()),
        };
        if shown == Shown::Blank(Backdrop::Black)
            && matches!(self.shown.last(), Some(Shown::Stimulus(_)))
        {
            self.timer.advance(self.blackout_latency);
        }
        self.shown.push(shown);
        Ok(self.timer.now())
    }

    fn poll_keys(&mut self, timeout: Duration) -> Vec<Key> {
        if timeout.is_zero() {
            return std::mem::take(&mut self.pending);
        }
        self.timer.advance(timeout);
        match self.shown.last() {
            Some(Shown::Message(..)) if self.gate_redraws > 0 => {
                self.gate_redraws -= 1;
                self.redraw = true;
                Vec::new()
            }
            Some(Shown::Message(..)) => vec![Key::Space],
            Some(Shown::Question(_)) => match self.batches.pop_front() {
                Some(batch) => {
                    self.redraw = batch.is_empty();
                    batch
                }
                None => vec![Key::Escape],
            },
            _ => Vec::new(),
        }
    }

    fn preload(&mut self, image: &Path) -> Result<(), DisplayError> {
        if self.is_broken(image) {
            return Err(Self::image_error(image));
        }
        self.timer.advance(self.decode_latency);
        self.shown.push(Shown::Preload(image.to_path_buf()));
        Ok(())
    }

    fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }
}

fn config(tasks: Vec<Task>) -> ExperimentConfig {
    ExperimentConfig {
        tasks,
        ..ExperimentConfig::default()
    }
}

fn participant() -> ParticipantInfo {
    ParticipantInfo::named("P1").unwrap()
}

#[test]
fn two_tasks_yield_typed_and_chosen_answers() {
    let config = config(vec![
        Task::new("images/VALO_a.png", vec![Question::text("How many?", "VALO_count")]),
        Task::new(
            "images/LOL_b.png",
            vec![Question::choice("Which?", "LOL_pick", ["first", "second", "third"])],
        ),
    ]);
    let timer = ManualTimer::new();
    let display = ScriptedDisplay::new(timer.clone(), &["4", "return", "2", "return"]);

    let mut session = Session::new(&config, display, timer, participant());
    let outcome = session.run().unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].answer("VALO_count"), Some("4"));
    assert_eq!(outcome.results[1].answer("LOL_pick"), Some("second"));
    assert_eq!(outcome.results[1].trial_number, 2);
    assert!(outcome.results.iter().all(|r| r.participant == "P1"));
}

#[test]
fn countdown_precedes_only_the_first_trial() {
    let config = config(vec![
        Task::new("a.png", vec![Question::text("q", "A")]),
        Task::new("b.png", vec![Question::text("q", "B")]),
        Task::new("c.png", vec![Question::text("q", "C")]),
    ]);
    let timer = ManualTimer::new();
    let display = ScriptedDisplay::new(
        timer.clone(),
        &["1", "return", "2", "return", "3", "return"],
    );

    let mut session = Session::new(&config, display, timer, participant());
    session.run().unwrap();
    let display = session.into_display();

    assert_eq!(display.messages(Tone::Countdown), vec!["3", "2", "1"]);
    let progress = display.messages(Tone::Notice);
    assert!(progress[0].starts_with("タスク 2/3"));
    assert!(progress[1].starts_with("タスク 3/3"));
    assert_eq!(progress.len(), 3, "two progress gates and the end screen");
    assert_eq!(display.messages(Tone::Summary).len(), 3);
}

#[test]
fn transitions_fire_once_per_game_change() {
    let images = [
        "images/VALO_1.png",
        "images/VALO_2.png",
        "images/intro.png",
        "images/LOL_1.jpg",
        "images/VALO_3.png",
        "images/FN_1.png",
        "images/FN_2.png",
    ];
    let tasks = images
        .iter()
        .enumerate()
        .map(|(i, image)| Task::new(*image, vec![Question::text("q", format!("L{i}"))]))
        .collect();
    let config = config(tasks);
    let keys: Vec<&str> = images.iter().flat_map(|_| ["1", "return"]).collect();
    let timer = ManualTimer::new();
    let display = ScriptedDisplay::new(timer.clone(), &keys);

    let mut session = Session::new(&config, display, timer, participant());
    let outcome = session.run().unwrap();

    assert_eq!(
        outcome.transitions,
        vec![
            Game::Valorant,
            Game::LeagueOfLegends,
            Game::Valorant,
            Game::Fortnite
        ]
    );
    let display = session.into_display();
    let shown = display.messages(Tone::Transition);
    assert_eq!(shown.len(), 4);
    assert!(shown[1].contains("League of Legends"));
}

#[test]
fn broken_image_skips_the_trial() {
    let config = config(vec![
        Task::new("missing.png", vec![Question::text("q", "A")]),
        Task::new("ok.png", vec![Question::text("q", "B")]),
    ]);
    let timer = ManualTimer::new();
    let mut display = ScriptedDisplay::new(timer.clone(), &["7", "return"]);
    display.broken_images.push(PathBuf::from("missing.png"));

    let mut session = Session::new(&config, display, timer, participant());
    let outcome = session.run().unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].trial_number, 2);
    assert_eq!(outcome.results[0].answer("B"), Some("7"));
    let display = session.into_display();
    assert_eq!(display.count(&Shown::Stimulus(PathBuf::from("ok.png"))), 1);
    assert_eq!(display.count(&Shown::Preload(PathBuf::from("missing.png"))), 0);
    assert_eq!(display.count(&Shown::Fixation), 2);
}

#[test]
fn escape_during_a_question_aborts() {
    let config = config(vec![Task::new("a.png", vec![Question::text("q", "A")])]);
    let timer = ManualTimer::new();
    let display = ScriptedDisplay::new(timer.clone(), &["4", "escape"]);

    let mut session = Session::new(&config, display, timer, participant());
    assert!(matches!(session.run(), Err(ExperimentError::Aborted)));
}

#[test]
fn escape_beats_confirm_in_the_same_poll() {
    let config = config(vec![Task::new("a.png", vec![Question::text("q", "A")])]);
    let timer = ManualTimer::new();
    let mut display = ScriptedDisplay::new(timer.clone(), &["4"]);
    display.batches.push_back(vec![Key::Return, Key::Escape]);

    let mut session = Session::new(&config, display, timer, participant());
    assert!(matches!(session.run(), Err(ExperimentError::Aborted)));
    let display = session.into_display();
    assert!(display.messages(Tone::Summary).is_empty());
}

#[test]
fn pending_escape_stops_before_fixation() {
    let config = config(vec![Task::new("a.png", vec![Question::text("q", "A")])]);
    let timer = ManualTimer::new();
    let mut display = ScriptedDisplay::new(timer.clone(), &[]);
    display.pending.push(Key::Escape);

    let mut session = Session::new(&config, display, timer, participant());
    assert!(matches!(session.run(), Err(ExperimentError::Aborted)));
    assert_eq!(session.into_display().count(&Shown::Fixation), 0);
}

#[test]
fn realized_duration_is_measured_flip_to_flip() {
    let config = config(vec![Task::new("a.png", vec![Question::text("q", "A")])]);
    let timer = ManualTimer::new();
    let mut display = ScriptedDisplay::new(timer.clone(), &["1", "return"]);
    display.blackout_latency = Duration::from_millis(7);

    let mut session = Session::new(&config, display, timer, participant());
    let outcome = session.run().unwrap();
    let result = &outcome.results[0];

    let measured = Duration::from_nanos(result.onsets.blackout_ns - result.onsets.stimulus_ns);
    assert_eq!(result.stimulus_duration_actual, measured);
    assert_eq!(measured, Duration::from_millis(2507));
    assert_ne!(measured, config.timing.stimulus());

    let stats = outcome.timing.unwrap();
    assert_eq!(stats.samples, 1);
    assert_eq!(stats.mean, Duration::from_millis(2507));
}

#[test]
fn fixation_follows_a_grey_frame() {
    let config = config(vec![Task::new("a.png", vec![Question::text("q", "A")])]);
    let timer = ManualTimer::new();
    let display = ScriptedDisplay::new(timer.clone(), &["1", "return"]);

    let mut session = Session::new(&config, display, timer, participant());
    session.run().unwrap();
    let shown = session.into_display().shown;

    let start = shown
        .iter()
        .position(|s| *s == Shown::Blank(Backdrop::Black))
        .unwrap();
    assert_eq!(
        &shown[start..start + 6],
        &[
            Shown::Blank(Backdrop::Black),
            Shown::Blank(Backdrop::Grey),
            Shown::Fixation,
            Shown::Preload(Path::new("a.png").to_path_buf()),
            Shown::Stimulus(Path::new("a.png").to_path_buf()),
            Shown::Blank(Backdrop::Black),
        ]
    );
}

#[test]
fn gate_is_presented_again_after_a_redraw_request() {
    let config = config(vec![Task::new("a.png", vec![Question::text("q", "A")])]);
    let timer = ManualTimer::new();
    let mut display = ScriptedDisplay::new(timer.clone(), &["1", "return"]);
    display.gate_redraws = 1;

    let mut session = Session::new(&config, display, timer, participant());
    session.run().unwrap();
    let shown = session.into_display().shown;

    assert!(matches!(shown[0], Shown::Message(..)));
    assert_eq!(shown[1], shown[0]);
    assert_ne!(shown[2], shown[0]);
}

#[test]
fn question_is_presented_again_after_a_redraw_request() {
    let config = config(vec![Task::new("a.png", vec![Question::text("q", "A")])]);
    let timer = ManualTimer::new();
    let mut display = ScriptedDisplay::new(timer.clone(), &["4"]);
    display.batches.push_back(Vec::new());
    display.batches.push_back(vec![Key::Return]);

    let mut session = Session::new(&config, display, timer, participant());
    let outcome = session.run().unwrap();
    assert_eq!(outcome.results[0].answer("A"), Some("4"));

    let display = session.into_display();
    let typed: Vec<&Shown> = display
        .shown
        .iter()
        .filter(|s| matches!(s, Shown::Question(text) if text.contains("4_")))
        .collect();
    assert_eq!(typed.len(), 2);
}

#[test]
fn decode_time_counts_toward_fixation() {
    let config = config(vec![
        Task::new("a.png", vec![Question::text("q", "A")]),
        Task::new("b.png", vec![Question::text("q", "B")]),
    ]);
    let fixation = config.timing.fixation();
    let timer = ManualTimer::new();
    let mut display = ScriptedDisplay::new(timer.clone(), &["1", "return", "2", "return"]);
    display.decode_latency = fixation / 4;

    let mut session = Session::new(&config, display, timer, participant());
    let outcome = session.run().unwrap();

    for result in &outcome.results {
        let shown_for = result.onsets.stimulus_ns - result.onsets.fixation_ns;
        assert_eq!(shown_for, fixation.as_nanos() as u64);
    }
}

#[test]
fn slow_decode_delays_the_stimulus_without_extra_sleep() {
    let config = config(vec![Task::new("a.png", vec![Question::text("q", "A")])]);
    let fixation = config.timing.fixation();
    let timer = ManualTimer::new();
    let mut display = ScriptedDisplay::new(timer.clone(), &["1", "return"]);
    display.decode_latency = fixation * 2;

    let mut session = Session::new(&config, display, timer, participant());
    let outcome = session.run().unwrap();

    let onsets = &outcome.results[0].onsets;
    assert_eq!(
        onsets.stimulus_ns - onsets.fixation_ns,
        (fixation * 2).as_nanos() as u64
    );
}
