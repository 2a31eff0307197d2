//! Runs one participant through the recall experiment and saves the row.

mod participant;
mod window;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use recall_core::ParticipantInfo;
use recall_experiment::{ExperimentConfig, ExperimentError, Session};
use recall_render::load_font;
use recall_store::{DataManager, LocalCsvSink, RemoteSink, Workbook};
use recall_timing::HighPrecisionTimer;
use tracing::{info, warn};

use crate::participant::prompt_participant;
use crate::window::{WindowSettings, WinitDisplay};

#[derive(Parser)]
#[command(name = "recall")]
#[command(about = "Game screenshot recall experiment")]
struct Cli {
    /// Experiment configuration (TOML); the built-in task list is used otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Participant name; asked on the terminal when omitted
    #[arg(short, long)]
    participant: Option<String>,

    /// Open a sized window even if the configuration asks for fullscreen
    #[arg(long)]
    windowed: bool,

    /// Font for all participant-facing text
    #[arg(long)]
    font: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<ExperimentConfig> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ExperimentConfig::builtin().context("built-in configuration is invalid")?,
    };
    if cli.windowed {
        config.display.fullscreen = false;
    }
    if let Some(font) = &cli.font {
        config.display.font_path = Some(font.clone());
    }
    Ok(config)
}

fn data_manager(config: &ExperimentConfig) -> DataManager {
    let manager = DataManager::new(&config.tasks, LocalCsvSink::new(&config.output.local_dir));
    match &config.output.workbook {
        Some(workbook) => manager.with_remote(RemoteSink::new(
            Box::new(Workbook::new(&workbook.root)),
            &workbook.spreadsheet,
            &workbook.worksheet,
        )),
        None => manager,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        experiment = %config.experiment.name,
        tasks = config.tasks.len(),
        questions = config.total_questions(),
        "configuration loaded"
    );

    let participant = match cli.participant.as_deref().and_then(ParticipantInfo::named) {
        Some(participant) => participant,
        None => prompt_participant(&mut io::stdin().lock(), &mut io::stdout(), Local::now)?,
    };
    info!(participant = %participant.name, "participant");

    let font = load_font(config.display.font_path.as_deref()).context("no usable font")?;
    let timer = HighPrecisionTimer::new();
    let display = WinitDisplay::open(WindowSettings::from_config(&config), font, timer.clone())?;

    let mut session = Session::new(&config, display, timer, participant.clone());
    let outcome = match session.run() {
        Ok(outcome) => outcome,
        Err(ExperimentError::Aborted) => {
            info!("session cancelled, nothing saved");
            return Ok(());
        }
        Err(e) => return Err(e).context("experiment failed"),
    };

    let report = data_manager(&config).save(&participant, &outcome.results, Local::now());
    if !report.any_saved() {
        warn!("results were not saved anywhere");
    }
    match session.show_save_report(&report) {
        Ok(()) | Err(ExperimentError::Aborted) => {}
        Err(e) => warn!(error = %e, "could not show the save status"),
    }
    info!(trials = outcome.results.len(), "experiment finished");
    Ok(())
}
