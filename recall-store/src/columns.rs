use chrono::{DateTime, Local};
use recall_core::{Task, TrialResult};

pub const PARTICIPANT_COLUMN: &str = "参加者名";
pub const TIMESTAMP_COLUMN: &str = "実施日時";

/// One answer column: `Q<n>: <label>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub header: String,
    pub label: String,
}

/// Numbers every question in configuration order, across tasks.
pub fn question_columns(tasks: &[Task]) -> Vec<Column> {
    tasks
        .iter()
        .flat_map(|task| task.questions.iter())
        .enumerate()
        .map(|(i, question)| Column {
            header: format!("Q{}: {}", i + 1, question.label),
            label: question.label.clone(),
        })
        .collect()
}

pub fn header_row(columns: &[Column]) -> Vec<String> {
    [PARTICIPANT_COLUMN.to_string(), TIMESTAMP_COLUMN.to_string()]
        .into_iter()
        .chain(columns.iter().map(|c| c.header.clone()))
        .collect()
}

/// Local time without offset, to the microsecond.
pub fn iso_timestamp(time: &DateTime<Local>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// The single row saved for a participant. Each column takes the first
/// answer with its label among `results`, whatever order they arrived in.
pub fn participant_row(
    columns: &[Column],
    results: &[TrialResult],
    participant: &str,
    time: &DateTime<Local>,
) -> Vec<String> {
    let mut row = Vec::with_capacity(columns.len() + 2);
    row.push(participant.to_string());
    row.push(iso_timestamp(time));
    for column in columns {
        let answer = results
            .iter()
            .find_map(|r| r.answer(&column.label))
            .unwrap_or_default();
        row.push(answer.to_string());
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use recall_core::{Answer, Onsets, Question};
    use std::time::Duration;

    fn tasks() -> Vec<Task> {
        vec![
            Task::new(
                "VALO_a.png",
                vec![Question::text("q", "ally"), Question::text("q", "enemy")],
            ),
            Task::new("FN_b.png", vec![Question::choice("q", "hp", ["low", "high"])]),
        ]
    }

    fn result(number: usize, answers: &[(&str, &str)]) -> TrialResult {
        TrialResult {
            trial_number: number,
            image: "x.png".into(),
            onsets: Onsets {
                fixation_ns: 0,
                stimulus_ns: 0,
                blackout_ns: 0,
            },
            stimulus_duration_actual: Duration::ZERO,
            answers: answers
                .iter()
                .map(|(label, value)| Answer {
                    label: label.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            participant: "P1".into(),
            timestamp: Local::now(),
        }
    }

    #[test]
    fn columns_number_questions_across_tasks() {
        let headers: Vec<_> = question_columns(&tasks()).into_iter().map(|c| c.header).collect();
        assert_eq!(headers, vec!["Q1: ally", "Q2: enemy", "Q3: hp"]);
    }

    #[test]
    fn header_leads_with_identity_columns() {
        let header = header_row(&question_columns(&tasks()));
        assert_eq!(&header[..2], &["参加者名", "実施日時"]);
        assert_eq!(header.len(), 5);
    }

    #[test]
    fn row_follows_column_order_not_result_order() {
        let columns = question_columns(&tasks());
        let results = vec![
            result(2, &[("hp", "high")]),
            result(1, &[("enemy", "3"), ("ally", "2")]),
        ];
        let time = Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let row = participant_row(&columns, &results, "P1", &time);
        assert_eq!(row, vec!["P1", "2025-03-04T05:06:07.000000", "2", "3", "high"]);
    }

    #[test]
    fn missing_answers_are_empty_and_first_match_wins() {
        let columns = question_columns(&tasks());
        let results = vec![result(1, &[("ally", "first")]), result(2, &[("ally", "second")])];
        let row = participant_row(&columns, &results, "P1", &Local::now());
        assert_eq!(&row[2..], &["first", "", ""]);
    }
}
