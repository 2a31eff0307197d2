use serde::{Serialize, Serializer};

use crate::data::{Columns, Dataset};

/// Self-reported play experience, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExperienceGroup {
    NoneOrLittle,
    ModerateOrMuch,
    VeryMuch,
}

impl ExperienceGroup {
    pub const ALL: [ExperienceGroup; 3] = [Self::NoneOrLittle, Self::ModerateOrMuch, Self::VeryMuch];

    /// Substring match on the free-text answer; first rule wins.
    pub fn classify(answer: &str) -> Option<Self> {
        if answer.contains("ない") || answer.contains("少しある") {
            Some(Self::NoneOrLittle)
        } else if answer.contains("ある程度ある") || answer.contains("かなりある") {
            Some(Self::ModerateOrMuch)
        } else if answer.contains("非常に多い") {
            Some(Self::VeryMuch)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NoneOrLittle => "ない・少しある",
            Self::ModerateOrMuch => "ある程度ある・かなりある",
            Self::VeryMuch => "非常に多い",
        }
    }

    /// Latin label for the chart axis.
    pub fn chart_label(self) -> &'static str {
        match self {
            Self::NoneOrLittle => "None/Little",
            Self::ModerateOrMuch => "Moderate/Much",
            Self::VeryMuch => "Very Much",
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        match self {
            Self::NoneOrLittle => [0xff, 0x99, 0x99],
            Self::ModerateOrMuch => [0x66, 0xb3, 0xff],
            Self::VeryMuch => [0x99, 0xff, 0x99],
        }
    }
}

impl Serialize for ExperienceGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Percentage of truthy cells among the non-empty ones.
pub fn accuracy<'a>(cells: impl IntoIterator<Item = &'a str>) -> Option<f64> {
    let mut answered = 0usize;
    let mut correct = 0usize;
    for cell in cells.into_iter().map(str::trim).filter(|c| !c.is_empty()) {
        answered += 1;
        if is_truthy(cell) {
            correct += 1;
        }
    }
    (answered > 0).then(|| correct as f64 / answered as f64 * 100.0)
}

fn is_truthy(cell: &str) -> bool {
    ["TRUE", "T", "1", "1.0"]
        .iter()
        .any(|t| cell.eq_ignore_ascii_case(t))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub name: String,
    pub group: Option<ExperienceGroup>,
    pub accuracy: Option<f64>,
}

pub fn participants(data: &Dataset, columns: Columns, correct: &[usize]) -> Vec<Participant> {
    (0..data.rows.len())
        .map(|row| Participant {
            name: data.cell(row, columns.participant).to_string(),
            group: ExperienceGroup::classify(data.cell(row, columns.experience)),
            accuracy: accuracy(correct.iter().map(|&c| data.cell(row, c))),
        })
        .collect()
}
