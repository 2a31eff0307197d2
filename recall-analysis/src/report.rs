//! Writes the report, the per-participant table and the chart.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::Font;
use recall_render::{Bar, BarChart, Bracket};
use recall_store::{PARTICIPANT_COLUMN, table};
use serde::Serialize;
use tiny_skia::Color;
use tracing::info;

use crate::AnalysisError;
use crate::analysis::{Analysis, significance_symbol};
use crate::groups::{ExperienceGroup, Participant};

pub const REPORT_FILE: &str = "analysis_results.json";
pub const PARTICIPANTS_FILE: &str = "participants.csv";
pub const CHART_FILE: &str = "accuracy_by_experience.png";

const CHART_WIDTH: u32 = 1000;
const CHART_HEIGHT: u32 = 600;

#[derive(Serialize)]
struct Report<'a> {
    input: String,
    correct_columns: &'a [String],
    #[serde(flatten)]
    analysis: &'a Analysis,
}

pub fn write_report(
    dir: &Path,
    input: &Path,
    correct_columns: &[String],
    analysis: &Analysis,
) -> Result<PathBuf, AnalysisError> {
    let report = Report {
        input: input.display().to_string(),
        correct_columns,
        analysis,
    };
    let path = dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(&report)?;
    write(&path, json)?;
    info!(path = %path.display(), "wrote report");
    Ok(path)
}

/// Participants sorted by group order, unclassified rows last.
pub fn participant_rows(participants: &[Participant]) -> Vec<Vec<String>> {
    let mut sorted: Vec<&Participant> = participants.iter().collect();
    sorted.sort_by_key(|p| p.group.map_or(ExperienceGroup::ALL.len(), |g| g as usize));

    let mut rows = vec![vec![
        PARTICIPANT_COLUMN.to_string(),
        "experience_group".to_string(),
        "accuracy_rate".to_string(),
    ]];
    rows.extend(sorted.into_iter().map(|p| {
        vec![
            p.name.clone(),
            p.group.map(|g| g.label().to_string()).unwrap_or_default(),
            p.accuracy.map(|a| format!("{a:.2}")).unwrap_or_default(),
        ]
    }));
    rows
}

pub fn write_participants(dir: &Path, participants: &[Participant]) -> Result<PathBuf, AnalysisError> {
    let path = dir.join(PARTICIPANTS_FILE);
    write(&path, table::encode(&participant_rows(participants), true))?;
    info!(path = %path.display(), rows = participants.len(), "wrote participants");
    Ok(path)
}

fn write(path: &Path, contents: String) -> Result<(), AnalysisError> {
    fs::write(path, contents).map_err(|source| AnalysisError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn accuracy_chart(analysis: &Analysis) -> BarChart {
    let bars: Vec<Bar> = analysis
        .descriptive
        .iter()
        .map(|d| {
            let [r, g, b] = d.group.rgb();
            Bar {
                label: d.group.chart_label().to_string(),
                mean: d.stats.mean,
                sd: d.stats.std.unwrap_or(0.0),
                color: Color::from_rgba8(r, g, b, 0xcc),
            }
        })
        .collect();

    let index = |group: ExperienceGroup| analysis.descriptive.iter().position(|d| d.group == group);
    let (first, last) = (ExperienceGroup::NoneOrLittle, ExperienceGroup::VeryMuch);
    let bracket = match (index(first), index(last), analysis.significant_pair(first, last)) {
        (Some(from), Some(to), Some(p)) => significance_symbol(p).map(|symbol| Bracket {
            from,
            to,
            symbol: symbol.to_string(),
        }),
        _ => None,
    };

    BarChart {
        title: "Mean Accuracy Rate by Experience Level".to_string(),
        x_label: "Experience Level".to_string(),
        y_label: "Mean Accuracy Rate (%)".to_string(),
        bars,
        bracket,
        note: analysis
            .anova_p()
            .filter(|&p| p < 0.05)
            .map(|_| "p < 0.05 (ANOVA)".to_string()),
    }
}

pub fn write_chart<F: Font>(dir: &Path, analysis: &Analysis, font: &F) -> Result<PathBuf, AnalysisError> {
    let path = dir.join(CHART_FILE);
    accuracy_chart(analysis).save_png(font, CHART_WIDTH, CHART_HEIGHT, &path)?;
    info!(path = %path.display(), "wrote chart");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str, group: Option<ExperienceGroup>, accuracy: Option<f64>) -> Participant {
        Participant {
            name: name.to_string(),
            group,
            accuracy,
        }
    }

    #[test]
    fn rows_follow_group_order() {
        let rows = participant_rows(&[
            person("c", Some(ExperienceGroup::VeryMuch), Some(90.0)),
            person("x", None, None),
            person("a", Some(ExperienceGroup::NoneOrLittle), Some(62.5)),
            person("b", Some(ExperienceGroup::ModerateOrMuch), Some(100.0 / 3.0)),
        ]);
        let names: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "x"]);
        assert_eq!(rows[1], ["a", "ない・少しある", "62.50"]);
        assert_eq!(rows[2][2], "33.33");
        assert_eq!(rows[4], ["x", "", ""]);
    }

    #[test]
    fn chart_without_significance_has_no_bracket() {
        let analysis = Analysis::run(&[
            person("a", Some(ExperienceGroup::NoneOrLittle), Some(50.0)),
            person("b", Some(ExperienceGroup::NoneOrLittle), Some(60.0)),
            person("c", Some(ExperienceGroup::VeryMuch), Some(55.0)),
            person("d", Some(ExperienceGroup::VeryMuch), Some(58.0)),
        ]);
        let chart = accuracy_chart(&analysis);
        assert_eq!(chart.bars.len(), 2);
        assert_eq!(chart.bars[1].label, "Very Much");
        assert!(chart.bracket.is_none());
        assert!(chart.note.is_none());
    }
}
