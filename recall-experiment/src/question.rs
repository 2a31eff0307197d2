use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::time::Duration;

use recall_core::{Answer, Key, Question, QuestionKind, Screen, Tone};
use tracing::debug;

use crate::config::{DisplayStrings, fill};
use crate::gate::{check_escape, wait_for_space};
use crate::{Display, ExperimentConfig, ExperimentError};

/// Characters a free-text answer may contain besides letters and digits.
const TEXT_PUNCTUATION: &str = ".,!?-()%";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Confirmed(String),
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct TextEntry {
    text: String,
}

impl TextEntry {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn handle(&mut self, key: Key) -> Outcome {
        match key {
            Key::Escape => return Outcome::Cancelled,
            Key::Return => {
                let answer = self.text.trim();
                if !answer.is_empty() {
                    return Outcome::Confirmed(answer.to_string());
                }
            }
            Key::Backspace => {
                self.text.pop();
            }
            Key::Space => self.text.push(' '),
            Key::Char(c) if c.is_alphanumeric() || TEXT_PUNCTUATION.contains(c) => {
                self.text.push(c)
            }
            _ => {}
        }
        Outcome::Pending
    }
}

#[derive(Debug, Clone)]
pub struct SingleChoice<'a> {
    choices: &'a [String],
    cursor: usize,
}

impl<'a> SingleChoice<'a> {
    pub fn new(choices: &'a [String]) -> Self {
        Self { choices, cursor: 0 }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn handle(&mut self, key: Key) -> Outcome {
        let n = self.choices.len();
        match key {
            Key::Escape => return Outcome::Cancelled,
            Key::Return => {
                if let Some(choice) = self.choices.get(self.cursor) {
                    return Outcome::Confirmed(choice.clone());
                }
            }
            Key::Up if n > 0 => self.cursor = (self.cursor + n - 1) % n,
            Key::Down if n > 0 => self.cursor = (self.cursor + 1) % n,
            _ => {
                if let Some(d) = key.digit() {
                    let d = d as usize;
                    if (1..=n).contains(&d) {
                        self.cursor = d - 1;
                    }
                }
            }
        }
        Outcome::Pending
    }
}

#[derive(Debug, Clone)]
pub struct MultiChoice<'a> {
    choices: &'a [String],
    cursor: usize,
    selected: BTreeSet<usize>,
    no_selection: &'a str,
}

impl<'a> MultiChoice<'a> {
    pub fn new(choices: &'a [String], no_selection: &'a str) -> Self {
        Self {
            choices,
            cursor: 0,
            selected: BTreeSet::new(),
            no_selection,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn handle(&mut self, key: Key) -> Outcome {
        let n = self.choices.len();
        match key {
            Key::Escape => return Outcome::Cancelled,
            Key::Return => return Outcome::Confirmed(self.answer()),
            Key::Up if n > 0 => self.cursor = (self.cursor + n - 1) % n,
            Key::Down if n > 0 => self.cursor = (self.cursor + 1) % n,
            Key::Space => {
                if !self.selected.remove(&self.cursor) {
                    self.selected.insert(self.cursor);
                }
            }
            _ => {}
        }
        Outcome::Pending
    }

    /// Selected choices in declaration order.
    fn answer(&self) -> String {
        if self.selected.is_empty() {
            return self.no_selection.to_string();
        }
        self.selected
            .iter()
            .filter_map(|&i| self.choices.get(i).map(String::as_str))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Input state for one question on screen.
#[derive(Debug, Clone)]
pub enum QuestionState<'a> {
    Text(TextEntry),
    Choice(SingleChoice<'a>),
    MultiChoice(MultiChoice<'a>),
}

impl<'a> QuestionState<'a> {
    pub fn new(kind: &'a QuestionKind, no_selection: &'a str) -> Self {
        match kind {
            QuestionKind::Text => QuestionState::Text(TextEntry::default()),
            QuestionKind::Choice(choices) => QuestionState::Choice(SingleChoice::new(choices)),
            QuestionKind::MultipleChoice(choices) => {
                QuestionState::MultiChoice(MultiChoice::new(choices, no_selection))
            }
        }
    }

    pub fn handle(&mut self, key: Key) -> Outcome {
        match self {
            QuestionState::Text(state) => state.handle(key),
            QuestionState::Choice(state) => state.handle(key),
            QuestionState::MultiChoice(state) => state.handle(key),
        }
    }

    /// Applies a poll batch. Escape anywhere in the batch cancels before any
    /// other key is seen; keys after a confirming key are dropped.
    pub fn handle_batch(&mut self, keys: &[Key]) -> Outcome {
        if keys.contains(&Key::Escape) {
            return Outcome::Cancelled;
        }
        for &key in keys {
            if let outcome @ Outcome::Confirmed(_) = self.handle(key) {
                return outcome;
            }
        }
        Outcome::Pending
    }
}

/// Full text of a question screen.
pub fn question_text(
    question: &Question,
    state: &QuestionState<'_>,
    index: usize,
    total: usize,
    strings: &DisplayStrings,
) -> String {
    let current = index.to_string();
    let total = total.to_string();
    let mut text = fill(
        &strings.question_header,
        &[("current", current.as_str()), ("total", total.as_str())],
    );
    let _ = write!(text, "\n\n{}\n\n", question.prompt);

    match state {
        QuestionState::Text(entry) => {
            let caret = format!("{}_", entry.text());
            let _ = write!(
                text,
                "{}\n\n{}\n\n{}",
                strings.text_instruction,
                fill(&strings.text_answer, &[("answer", caret.as_str())]),
                strings.text_legend
            );
        }
        QuestionState::Choice(choice) => {
            for (i, label) in question.kind.choices().iter().enumerate() {
                let marker = if i == choice.cursor() { "→" } else { "  " };
                let _ = writeln!(text, "{marker} {}. {label}", i + 1);
            }
            let _ = write!(text, "\n{}", strings.choice_legend);
        }
        QuestionState::MultiChoice(multi) => {
            for (i, label) in question.kind.choices().iter().enumerate() {
                let marker = if i == multi.cursor() { "→" } else { "  " };
                let check = if multi.is_selected(i) { "✓" } else { " " };
                let _ = writeln!(text, "{marker} [{check}] {}. {label}", i + 1);
            }
            let _ = write!(text, "\n{}", strings.multi_legend);
        }
    }
    text
}

/// Text of the answer review shown after a task's last question.
pub fn summary_text(answers: &[Answer], strings: &DisplayStrings) -> String {
    let mut text = strings.summary_header.clone();
    text.push('\n');
    for (i, answer) in answers.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", i + 1, answer.value);
    }
    let _ = write!(text, "\n{}", strings.summary_footer);
    text
}

/// Runs the question screens of one task.
pub struct QuestionInterface<'c> {
    strings: &'c DisplayStrings,
    poll: Duration,
}

impl<'c> QuestionInterface<'c> {
    pub fn new(config: &'c ExperimentConfig) -> Self {
        Self {
            strings: &config.strings,
            poll: config.timing.poll_interval(),
        }
    }

    /// Asks every question in order, then shows the answer review.
    pub fn ask_all<D: Display>(
        &self,
        display: &mut D,
        questions: &[Question],
    ) -> Result<Vec<Answer>, ExperimentError> {
        let mut answers = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            let value = self.ask(display, question, i + 1, questions.len())?;
            debug!(label = %question.label, value = %value, "answer confirmed");
            answers.push(Answer {
                label: question.label.clone(),
                value,
            });
        }

        let summary = summary_text(&answers, self.strings);
        wait_for_space(
            display,
            &Screen::Message {
                text: &summary,
                tone: Tone::Summary,
            },
            self.poll,
        )?;
        Ok(answers)
    }

    pub fn ask<D: Display>(
        &self,
        display: &mut D,
        question: &Question,
        index: usize,
        total: usize,
    ) -> Result<String, ExperimentError> {
        let mut state = QuestionState::new(&question.kind, &self.strings.no_selection);
        let compact = matches!(question.kind, QuestionKind::MultipleChoice(_));
        let mut dirty = true;
        loop {
            if dirty {
                let text = question_text(question, &state, index, total, self.strings);
                display.present(&Screen::Question {
                    text: &text,
                    compact,
                })?;
                dirty = false;
            }

            let keys = display.poll_keys(self.poll);
            if display.take_redraw() {
                dirty = true;
            }
            if keys.is_empty() {
                continue;
            }
            check_escape(&keys)?;
            match state.handle_batch(&keys) {
                Outcome::Confirmed(answer) => return Ok(answer),
                Outcome::Cancelled => return Err(ExperimentError::Aborted),
                Outcome::Pending => dirty = true,
            }
        }
    }
}
