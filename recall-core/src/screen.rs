use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backdrop {
    Black,
    Grey,
}

/// Visual style of a message frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Welcome,
    Notice,
    Transition,
    Summary,
    Countdown,
    Status,
}

/// One frame the experiment asks a display to present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen<'a> {
    Blank(Backdrop),
    Fixation,
    Stimulus(&'a Path),
    /// Full-screen text; gates wait for space after it.
    Message { text: &'a str, tone: Tone },
    Question { text: &'a str, compact: bool },
}

impl Screen<'_> {
    pub fn backdrop(&self) -> Backdrop {
        match self {
            Screen::Blank(backdrop) => *backdrop,
            Screen::Fixation => Backdrop::Grey,
            _ => Backdrop::Black,
        }
    }
}

/// How large stimulus images are drawn relative to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Always fill the window.
    Fullscreen,
    /// Fill the window up to the width of a 24-inch 1440p panel.
    #[default]
    #[serde(rename = "max_24_inch")]
    Max24Inch,
    /// Fill the window in both fullscreen and windowed runs.
    Auto,
}
