use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use recall_core::{DisplayMode, ModelError, Task};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN: &str = include_str!("../assets/tasks.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("configuration lists no tasks")]
    NoTasks,
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("timing.{0} must be a finite, non-negative number of seconds")]
    Timing(&'static str),
    #[error("timing.poll_interval_ms must be at least 1")]
    PollInterval,
}

/// Everything a session needs, fixed at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub experiment: ExperimentInfo,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub strings: DisplayStrings,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Default for ExperimentInfo {
    fn default() -> Self {
        Self {
            name: "リコール課題".into(),
            description: String::new(),
        }
    }
}

/// Phase durations in seconds, as experimenters write them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub clear_secs: f64,
    pub fixation_grey_secs: f64,
    pub fixation_secs: f64,
    pub stimulus_secs: f64,
    pub blackout_secs: f64,
    pub countdown: Vec<u32>,
    pub countdown_step_secs: f64,
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            clear_secs: 0.3,
            fixation_grey_secs: 0.1,
            fixation_secs: 2.0,
            stimulus_secs: 2.5,
            blackout_secs: 1.5,
            countdown: vec![3, 2, 1],
            countdown_step_secs: 1.0,
            poll_interval_ms: 10,
        }
    }
}

impl TimingConfig {
    pub fn clear(&self) -> Duration {
        secs(self.clear_secs)
    }

    pub fn fixation_grey(&self) -> Duration {
        secs(self.fixation_grey_secs)
    }

    pub fn fixation(&self) -> Duration {
        secs(self.fixation_secs)
    }

    pub fn stimulus(&self) -> Duration {
        secs(self.stimulus_secs)
    }

    pub fn blackout(&self) -> Duration {
        secs(self.blackout_secs)
    }

    pub fn countdown_step(&self) -> Duration {
        secs(self.countdown_step_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("clear_secs", self.clear_secs),
            ("fixation_grey_secs", self.fixation_grey_secs),
            ("fixation_secs", self.fixation_secs),
            ("stimulus_secs", self.stimulus_secs),
            ("blackout_secs", self.blackout_secs),
            ("countdown_step_secs", self.countdown_step_secs),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Timing(name));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }
        Ok(())
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub mode: DisplayMode,
    pub fullscreen: bool,
    /// Window size when not fullscreen.
    pub width: u32,
    pub height: u32,
    pub font_path: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Max24Inch,
            fullscreen: true,
            width: 1470,
            height: 956,
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    /// Remote sink target; the remote sink is disabled without it.
    #[serde(default)]
    pub workbook: Option<WorkbookConfig>,
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("result")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            local_dir: default_local_dir(),
            workbook: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookConfig {
    pub root: PathBuf,
    pub spreadsheet: String,
    pub worksheet: String,
}

/// Participant-facing text. `{name}` style placeholders are filled by [`fill`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayStrings {
    pub welcome: String,
    pub transition: String,
    pub progress: String,
    pub end: String,
    pub question_header: String,
    pub text_instruction: String,
    pub text_answer: String,
    pub text_legend: String,
    pub choice_legend: String,
    pub multi_legend: String,
    pub summary_header: String,
    pub summary_footer: String,
    pub no_selection: String,
    pub save_title: String,
    pub remote_saved: String,
    pub remote_location: String,
    pub remote_failed: String,
    pub local_saved: String,
    pub local_failed: String,
    pub save_footer: String,
}

impl Default for DisplayStrings {
    fn default() -> Self {
        Self {
            welcome: "{name}\n\n\
                この実験では、ゲーム画面を見た後に質問に回答していただきます。\n\n\
                タスクの流れ：\n\
                1. 注視点（+）を見つめる\n\
                2. ゲーム画面が短時間表示される\n\
                3. 黒い画面になる\n\
                4. 質問に回答する\n\n\
                全部で{total}個のタスクがあります。\n\n\
                注意：\n\
                ・普段通りゲームをプレイしているつもりで画面を見てください。\n\n\
                ・注視点が現れたら、画面中央を見つめてください\n\
                ・途中で止めたい場合は ESC キーを押してください\n\n\
                準備ができたらスペースキーを押して開始してください。"
                .into(),
            transition: "ここからは{game}に関する問題になります。\n\n\
                準備ができたらスペースキーを押してください。"
                .into(),
            progress: "タスク {current}/{total}\n\n\
                準備ができたらスペースキーを押して次のタスクを開始してください。"
                .into(),
            end: "全てのタスクが終了しました。\n\n\
                ご協力ありがとうございました！\n\n\
                スペースキーを押して終了してください。"
                .into(),
            question_header: "質問 {current}/{total}".into(),
            text_instruction: "英数字で回答を入力してください".into(),
            text_answer: "回答: {answer}".into(),
            text_legend: "Enter: 確定 | Backspace: 削除 | ESC: 終了".into(),
            choice_legend: "↑↓: 選択  Enter: 確定  ESC: 終了".into(),
            multi_legend: "↑↓: 移動  Space: 選択/解除  Enter: 確定  ESC: 終了".into(),
            summary_header: "回答完了！\n\n入力した回答:".into(),
            summary_footer: "スペースキーを押して次のタスクに進んでください。".into(),
            no_selection: "選択なし".into(),
            save_title: "=== 保存完了 ===".into(),
            remote_saved: "✓ スプレッドシートに保存されました".into(),
            remote_location: "URL: {location}".into(),
            remote_failed: "✗ スプレッドシートへの保存に失敗しました".into(),
            local_saved: "✓ ローカルバックアップ: {path}".into(),
            local_failed: "✗ ローカル保存に失敗しました".into(),
            save_footer: "スペースキーを押して終了してください。".into(),
        }
    }
}

/// Replaces each `{key}` in `template` with its value.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

impl ExperimentConfig {
    /// The bundled configuration with the twenty recall tasks.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN, Path::new("<builtin>"))
    }

    /// Reads a TOML file. Relative image paths resolve against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents, path)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            for task in &mut config.tasks {
                if task.image.is_relative() {
                    task.image = base.join(&task.image);
                }
            }
        }
        Ok(config)
    }

    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }
        for task in &self.tasks {
            task.validate()?;
        }
        self.timing.validate()
    }

    pub fn total_questions(&self) -> usize {
        self.tasks.iter().map(|t| t.questions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::QuestionKind;
    use std::io::Write;

    #[test]
    fn builtin_carries_all_tasks() {
        let config = ExperimentConfig::builtin().unwrap();
        assert_eq!(config.tasks.len(), 20);
        assert_eq!(config.total_questions(), 38);
        assert_eq!(config.timing.stimulus(), Duration::from_millis(2500));
        assert_eq!(config.display.mode, DisplayMode::Max24Inch);
        assert!(config.output.workbook.is_none());

        let skill = &config.tasks[4].questions;
        assert!(matches!(skill[0].kind, QuestionKind::Choice(ref c) if c.len() == 4));
        assert!(matches!(skill[2].kind, QuestionKind::MultipleChoice(ref c) if c.len() == 7));
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config = ExperimentConfig::parse(
            r#"
            [[tasks]]
            image = "a.png"
            [[tasks.questions]]
            prompt = "How many?"
            label = "A"
            "#,
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(config.timing.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.timing.countdown, vec![3, 2, 1]);
        assert_eq!(config.strings.no_selection, "選択なし");
        assert_eq!(config.output.local_dir, PathBuf::from("result"));
        assert_eq!(config.tasks[0].questions[0].kind, QuestionKind::Text);
    }

    #[test]
    fn builtin_config_parses() {
        assert!(ExperimentConfig::builtin().is_ok());
    }

    #[test]
    fn display_modes_parse_by_name() {
        for (name, mode) in [
            ("fullscreen", DisplayMode::Fullscreen),
            ("max_24_inch", DisplayMode::Max24Inch),
            ("auto", DisplayMode::Auto),
        ] {
            let contents = format!(
                "[display]\nmode = \"{name}\"\n[[tasks]]\nimage = \"a.png\"\n\
                 [[tasks.questions]]\nprompt = \"q\"\nlabel = \"A\"\n"
            );
            let config = ExperimentConfig::parse(&contents, Path::new("inline")).unwrap();
            assert_eq!(config.display.mode, mode, "mode `{name}`");
        }
    }

    #[test]
    fn empty_task_list_is_rejected() {
        let err = ExperimentConfig::parse("[experiment]\nname = \"x\"\n", Path::new("inline"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoTasks));
    }

    #[test]
    fn choice_without_choices_is_rejected() {
        let err = ExperimentConfig::parse(
            r#"
            [[tasks]]
            image = "a.png"
            [[tasks.questions]]
            prompt = "Which?"
            label = "A"
            type = "choice"
            "#,
            Path::new("inline"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let err = ExperimentConfig::parse(
            r#"
            [timing]
            stimulus_secs = -1.0
            [[tasks]]
            image = "a.png"
            [[tasks.questions]]
            prompt = "q"
            label = "A"
            "#,
            Path::new("inline"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Timing("stimulus_secs")));
    }

    #[test]
    fn relative_images_resolve_against_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[[tasks]]\nimage = \"images/VALO_a.png\"\n[[tasks.questions]]\nprompt = \"q\"\nlabel = \"A\""
        )
        .unwrap();

        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.tasks[0].image, dir.path().join("images/VALO_a.png"));
    }

    #[test]
    fn unreadable_file_is_reported() {
        let err = ExperimentConfig::load(Path::new("/nonexistent/tasks.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn fill_replaces_placeholders() {
        assert_eq!(
            fill("タスク {current}/{total}", &[("current", "2"), ("total", "20")]),
            "タスク 2/20"
        );
    }
}
