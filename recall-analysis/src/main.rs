//! Accuracy analysis over the merged recall results table.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use recall_analysis::data::CORRECT_MARKER;
use recall_analysis::report::{write_chart, write_participants, write_report};
use recall_analysis::workbook::is_workbook;
use recall_analysis::{
    Analysis, Columns, DEFAULT_SHEET, Dataset, EXPERIENCE_COLUMN, TARGET_QUESTIONS, load_workbook,
    participants,
};
use recall_render::load_font;
use recall_store::PARTICIPANT_COLUMN;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "recall-analyze")]
#[command(about = "Compare recall accuracy across experience groups")]
struct Cli {
    /// Results workbook (.xlsx, .xls, .ods) or a CSV export of its sheet
    input: PathBuf,

    /// Workbook sheet to read; the first sheet is used when it is missing
    #[arg(long, default_value = DEFAULT_SHEET)]
    sheet: String,

    /// Directory for the report, participant table and chart
    #[arg(short, long, default_value = "analysis_output")]
    output: PathBuf,

    /// Column holding the participant name
    #[arg(long, default_value = PARTICIPANT_COLUMN)]
    participant_column: String,

    /// Column holding the experience answer
    #[arg(long, default_value = EXPERIENCE_COLUMN)]
    experience_column: String,

    /// Font for chart labels (system fonts are tried otherwise)
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut data = if is_workbook(&cli.input) {
        load_workbook(&cli.input, &cli.sheet)?
    } else {
        Dataset::load(&cli.input)?
    };
    let columns = Columns::find(&data, &cli.participant_column, &cli.experience_column)
        .context("results table is missing a required column")?;
    data.clean(columns.participant);

    let correct = data.correct_columns(TARGET_QUESTIONS);
    if correct.is_empty() {
        warn!(marker = CORRECT_MARKER, "no correctness columns found; accuracy is undefined");
    }
    let correct_names: Vec<String> = correct.iter().map(|&c| data.headers[c].clone()).collect();

    let people = participants(&data, columns, &correct);
    let analysis = Analysis::run(&people);
    info!(
        participants = analysis.participants,
        groups = analysis.samples.len(),
        tests = analysis.tests.len(),
        "analysis complete"
    );

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    write_report(&cli.output, &cli.input, &correct_names, &analysis)?;
    write_participants(&cli.output, &people)?;

    match load_font(cli.font.as_deref()) {
        Ok(font) => {
            write_chart(&cli.output, &analysis, &font)?;
        }
        Err(e) => warn!(error = %e, "no usable font, skipping chart"),
    }
    Ok(())
}
