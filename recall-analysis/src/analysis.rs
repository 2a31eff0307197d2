//! Groups accuracy rates and runs the test battery over them.

use serde::Serialize;
use tracing::{info, warn};

use crate::groups::{ExperienceGroup, Participant};
use crate::stats::{self, Descriptive};
use crate::tukey::tukey_hsd;

pub const ALPHA: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSample {
    pub group: ExperienceGroup,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub group: ExperienceGroup,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: ExperienceGroup,
    #[serde(flatten)]
    pub stats: Descriptive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestEntry {
    ShapiroWilk {
        group: ExperienceGroup,
        statistic: f64,
        p_value: f64,
        normal: bool,
    },
    Levene {
        statistic: f64,
        p_value: f64,
        equal_variance: bool,
    },
    Anova {
        f_statistic: f64,
        p_value: f64,
        eta_squared: f64,
        significant: bool,
    },
    TukeyHsd {
        group1: ExperienceGroup,
        group2: ExperienceGroup,
        meandiff: f64,
        p_adj: f64,
        lower: f64,
        upper: f64,
        reject: bool,
    },
    /// Stand-in for the HSD when it cannot be computed.
    MeanComparison {
        group1: ExperienceGroup,
        group2: ExperienceGroup,
        mean1: f64,
        mean2: f64,
        difference: f64,
    },
    KruskalWallis {
        statistic: f64,
        p_value: f64,
        significant: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub participants: usize,
    pub group_counts: Vec<GroupCount>,
    pub descriptive: Vec<GroupSummary>,
    pub tests: Vec<TestEntry>,
    #[serde(skip)]
    pub samples: Vec<GroupSample>,
}

/// Accuracy rates per group, in fixed group order, empty groups left out.
pub fn samples(participants: &[Participant]) -> Vec<GroupSample> {
    ExperienceGroup::ALL
        .iter()
        .filter_map(|&group| {
            let values: Vec<f64> = participants
                .iter()
                .filter(|p| p.group == Some(group))
                .filter_map(|p| p.accuracy)
                .collect();
            (!values.is_empty()).then_some(GroupSample { group, values })
        })
        .collect()
}

impl Analysis {
    pub fn run(participants: &[Participant]) -> Self {
        let samples = samples(participants);
        let group_counts = ExperienceGroup::ALL
            .iter()
            .map(|&group| GroupCount {
                group,
                count: participants.iter().filter(|p| p.group == Some(group)).count(),
            })
            .collect();
        let descriptive = samples
            .iter()
            .filter_map(|s| {
                stats::describe(&s.values).map(|stats| GroupSummary { group: s.group, stats })
            })
            .collect();

        let mut analysis = Self {
            participants: participants.len(),
            group_counts,
            descriptive,
            tests: Vec::new(),
            samples,
        };
        analysis.run_tests();
        analysis
    }

    fn run_tests(&mut self) {
        for s in &self.samples {
            if s.values.len() < 3 {
                continue;
            }
            match stats::shapiro_wilk(&s.values) {
                Ok(r) => self.tests.push(TestEntry::ShapiroWilk {
                    group: s.group,
                    statistic: r.statistic,
                    p_value: r.p_value,
                    normal: r.p_value > ALPHA,
                }),
                Err(e) => warn!(group = s.group.label(), error = %e, "skipped Shapiro-Wilk"),
            }
        }

        if self.samples.len() < 2 {
            warn!(groups = self.samples.len(), "not enough groups for comparison tests");
            return;
        }
        let groups: Vec<&[f64]> = self.samples.iter().map(|s| s.values.as_slice()).collect();

        match stats::levene(&groups) {
            Ok(r) => self.tests.push(TestEntry::Levene {
                statistic: r.statistic,
                p_value: r.p_value,
                equal_variance: r.p_value > ALPHA,
            }),
            Err(e) => warn!(error = %e, "skipped Levene"),
        }

        match stats::one_way_anova(&groups) {
            Ok(r) => {
                let significant = r.p_value < ALPHA;
                info!(f = r.f_statistic, p = r.p_value, eta2 = r.eta_squared, "ANOVA");
                self.tests.push(TestEntry::Anova {
                    f_statistic: r.f_statistic,
                    p_value: r.p_value,
                    eta_squared: r.eta_squared,
                    significant,
                });
                if significant {
                    let entries = post_hoc(&self.samples, &groups);
                    self.tests.extend(entries);
                }
            }
            Err(e) => warn!(error = %e, "skipped ANOVA"),
        }

        match stats::kruskal_wallis(&groups) {
            Ok(r) => self.tests.push(TestEntry::KruskalWallis {
                statistic: r.statistic,
                p_value: r.p_value,
                significant: r.p_value < ALPHA,
            }),
            Err(e) => warn!(error = %e, "skipped Kruskal-Wallis"),
        }
    }

    pub fn anova_p(&self) -> Option<f64> {
        self.tests.iter().find_map(|t| match t {
            TestEntry::Anova { p_value, .. } => Some(*p_value),
            _ => None,
        })
    }

    /// Adjusted p of a pair the HSD rejected, in either order.
    pub fn significant_pair(&self, a: ExperienceGroup, b: ExperienceGroup) -> Option<f64> {
        self.tests.iter().find_map(|t| match t {
            TestEntry::TukeyHsd { group1, group2, p_adj, reject: true, .. }
                if (*group1, *group2) == (a, b) || (*group1, *group2) == (b, a) =>
            {
                Some(*p_adj)
            }
            _ => None,
        })
    }
}

fn post_hoc(samples: &[GroupSample], groups: &[&[f64]]) -> Vec<TestEntry> {
    match tukey_hsd(groups, ALPHA) {
        Ok(pairs) => pairs
            .into_iter()
            .map(|p| TestEntry::TukeyHsd {
                group1: samples[p.a].group,
                group2: samples[p.b].group,
                meandiff: p.mean_diff,
                p_adj: p.p_adj,
                lower: p.lower,
                upper: p.upper,
                reject: p.reject,
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "Tukey HSD unavailable, comparing means");
            mean_comparisons(samples)
        }
    }
}

fn mean_comparisons(samples: &[GroupSample]) -> Vec<TestEntry> {
    let mut out = Vec::new();
    for (i, first) in samples.iter().enumerate() {
        for second in &samples[i + 1..] {
            let mean1 = stats::mean(&first.values);
            let mean2 = stats::mean(&second.values);
            out.push(TestEntry::MeanComparison {
                group1: first.group,
                group2: second.group,
                mean1,
                mean2,
                difference: mean2 - mean1,
            });
        }
    }
    out
}

pub fn significance_symbol(p: f64) -> Option<&'static str> {
    if p < 0.001 {
        Some("***")
    } else if p < 0.01 {
        Some("**")
    } else if p < 0.05 {
        Some("*")
    } else {
        None
    }
}
