use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("question `{0}` has an empty column label")]
    EmptyLabel(String),
    #[error("question `{label}` is a {kind} question but lists no choices")]
    MissingChoices { label: String, kind: &'static str },
    #[error("task for `{0}` has no questions")]
    NoQuestions(PathBuf),
}

/// Kind tag as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    #[default]
    Text,
    Choice,
    MultipleChoice,
}

/// Wire shape of a question before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub prompt: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: KindTag,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    Text,
    Choice(Vec<String>),
    MultipleChoice(Vec<String>),
}

impl QuestionKind {
    pub fn choices(&self) -> &[String] {
        match self {
            QuestionKind::Text => &[],
            QuestionKind::Choice(choices) | QuestionKind::MultipleChoice(choices) => choices,
        }
    }

    fn tag(&self) -> KindTag {
        match self {
            QuestionKind::Text => KindTag::Text,
            QuestionKind::Choice(_) => KindTag::Choice,
            QuestionKind::MultipleChoice(_) => KindTag::MultipleChoice,
        }
    }
}

/// One question shown after a stimulus. `label` names the output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuestionSpec", into = "QuestionSpec")]
pub struct Question {
    pub prompt: String,
    pub label: String,
    pub kind: QuestionKind,
}

impl Question {
    pub fn text(prompt: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            label: label.into(),
            kind: QuestionKind::Text,
        }
    }

    pub fn choice<I, S>(prompt: impl Into<String>, label: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt: prompt.into(),
            label: label.into(),
            kind: QuestionKind::Choice(choices.into_iter().map(Into::into).collect()),
        }
    }

    pub fn multiple_choice<I, S>(
        prompt: impl Into<String>,
        label: impl Into<String>,
        choices: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt: prompt.into(),
            label: label.into(),
            kind: QuestionKind::MultipleChoice(choices.into_iter().map(Into::into).collect()),
        }
    }
}

impl TryFrom<QuestionSpec> for Question {
    type Error = ModelError;

    fn try_from(spec: QuestionSpec) -> Result<Self, Self::Error> {
        if spec.label.trim().is_empty() {
            return Err(ModelError::EmptyLabel(spec.prompt));
        }
        let kind = match spec.kind {
            KindTag::Text => QuestionKind::Text,
            KindTag::Choice | KindTag::MultipleChoice if spec.choices.is_empty() => {
                return Err(ModelError::MissingChoices {
                    label: spec.label,
                    kind: if spec.kind == KindTag::Choice {
                        "choice"
                    } else {
                        "multiple_choice"
                    },
                });
            }
            KindTag::Choice => QuestionKind::Choice(spec.choices),
            KindTag::MultipleChoice => QuestionKind::MultipleChoice(spec.choices),
        };
        Ok(Self {
            prompt: spec.prompt,
            label: spec.label,
            kind,
        })
    }
}

impl From<Question> for QuestionSpec {
    fn from(question: Question) -> Self {
        let kind = question.kind.tag();
        let choices = match question.kind {
            QuestionKind::Text => Vec::new(),
            QuestionKind::Choice(choices) | QuestionKind::MultipleChoice(choices) => choices,
        };
        Self {
            prompt: question.prompt,
            label: question.label,
            kind,
            choices,
        }
    }
}

/// A stimulus image and the questions asked about it, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub image: PathBuf,
    pub questions: Vec<Question>,
}

impl Task {
    pub fn new(image: impl Into<PathBuf>, questions: Vec<Question>) -> Self {
        Self {
            image: image.into(),
            questions,
        }
    }

    pub fn image(&self) -> &Path {
        &self.image
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.questions.is_empty() {
            return Err(ModelError::NoQuestions(self.image.clone()));
        }
        Ok(())
    }
}
