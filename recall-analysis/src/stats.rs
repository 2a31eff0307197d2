//! The test battery: descriptives, Shapiro-Wilk, Levene, one-way ANOVA and
//! Kruskal-Wallis.

use serde::Serialize;
use thiserror::Error;

use crate::special::{chi2_sf, f_sf, norm_ppf, norm_sf};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("needs at least {needed} values, got {got}")]
    TooFewValues { needed: usize, got: usize },
    #[error("needs at least two groups, got {0}")]
    TooFewGroups(usize),
    #[error("all values are identical")]
    NoVariation,
    #[error("degrees of freedom too small for the studentized range")]
    DegreesOfFreedom,
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_sd(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn median(values: &[f64]) -> f64 {
    quantile(&sorted(values), 0.5)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptive {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q25: f64,
    #[serde(rename = "50%")]
    pub q50: f64,
    #[serde(rename = "75%")]
    pub q75: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Option<Descriptive> {
    if values.is_empty() {
        return None;
    }
    let s = sorted(values);
    Some(Descriptive {
        count: s.len(),
        mean: mean(&s),
        std: sample_sd(&s),
        min: s[0],
        q25: quantile(&s, 0.25),
        q50: quantile(&s, 0.5),
        q75: quantile(&s, 0.75),
        max: s[s.len() - 1],
    })
}

/// A test statistic with its p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

const SW_SMALL: f64 = 1e-19;

fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &k| acc * x + k)
}

/// Shapiro-Wilk W and its p-value (Royston's approximation).
pub fn shapiro_wilk(values: &[f64]) -> Result<TestResult, StatsError> {
    const G: [f64; 2] = [-2.273, 0.459];
    const C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
    const C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];
    const C3: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
    const C4: [f64; 4] = [1.3822, -0.778_57, 0.062_767, -0.002_032_2];
    const C5: [f64; 4] = [-1.5861, -0.310_82, -0.083_751, 0.003_891_5];
    const C6: [f64; 3] = [-0.4803, -0.082_676, 0.003_030_2];

    let n = values.len();
    if n < 3 {
        return Err(StatsError::TooFewValues { needed: 3, got: n });
    }
    let x = sorted(values);
    let range = x[n - 1] - x[0];
    if range < SW_SMALL {
        return Err(StatsError::NoVariation);
    }

    let an = n as f64;
    let half = n / 2;
    // Coefficients for the upper half; the lower half mirrors them negated.
    let mut a = vec![0.0; half];
    if n == 3 {
        a[0] = std::f64::consts::FRAC_1_SQRT_2;
    } else {
        let m: Vec<f64> = (1..=half)
            .map(|i| norm_ppf((i as f64 - 0.375) / (an + 0.25)))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&C1, rsn) - m[0] / ssumm2;
        let (first, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
            let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
                / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
                .sqrt();
            a[1] = a2;
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
            (1, fac)
        };
        a[0] = a1;
        for i in first..half {
            a[i] = -m[i] / fac;
        }
    }

    let mut coef = vec![0.0; n];
    for (i, &ai) in a.iter().enumerate() {
        coef[i] = -ai;
        coef[n - 1 - i] = ai;
    }

    let scaled: Vec<f64> = x.iter().map(|v| v / range).collect();
    let sx = mean(&scaled);
    let sa = mean(&coef);
    let (mut ssa, mut ssx, mut sax) = (0.0, 0.0, 0.0);
    for (c, v) in coef.iter().zip(&scaled) {
        let asa = c - sa;
        let xsx = v - sx;
        ssa += asa * asa;
        ssx += xsx * xsx;
        sax += asa * xsx;
    }
    let ssassx = (ssa * ssx).sqrt();
    // 1 - W, kept separate to avoid cancellation for W near 1.
    let w1 = (ssassx - sax) * (ssassx + sax) / (ssa * ssx);
    let w = (1.0 - w1).min(1.0);

    if n == 3 {
        const SIX_OVER_PI: f64 = 1.909_859_317_102_74;
        const PI_OVER_3: f64 = 1.047_197_551_196_6;
        let p = (SIX_OVER_PI * (w.sqrt().asin() - PI_OVER_3)).max(0.0);
        return Ok(TestResult { statistic: w, p_value: p });
    }

    if w1 <= 0.0 {
        return Ok(TestResult { statistic: w, p_value: 1.0 });
    }
    let mut y = w1.ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return Ok(TestResult { statistic: w, p_value: 1e-99 });
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let ln_n = an.ln();
        (poly(&C5, ln_n), poly(&C6, ln_n).exp())
    };
    let p = norm_sf((y - m) / s);
    Ok(TestResult { statistic: w, p_value: p })
}

fn check_groups(groups: &[&[f64]]) -> Result<(), StatsError> {
    if groups.len() < 2 {
        return Err(StatsError::TooFewGroups(groups.len()));
    }
    if let Some(g) = groups.iter().find(|g| g.is_empty()) {
        return Err(StatsError::TooFewValues { needed: 1, got: g.len() });
    }
    Ok(())
}

/// Levene's test centred on group medians (Brown-Forsythe).
pub fn levene(groups: &[&[f64]]) -> Result<TestResult, StatsError> {
    check_groups(groups)?;
    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let m = median(g);
            g.iter().map(|v| (v - m).abs()).collect()
        })
        .collect();
    let refs: Vec<&[f64]> = deviations.iter().map(Vec::as_slice).collect();
    let table = SumOfSquares::of(&refs)?;
    if table.within <= 0.0 {
        return Err(StatsError::NoVariation);
    }
    let w = table.f();
    Ok(TestResult {
        statistic: w,
        p_value: f_sf(w, table.df_between, table.df_within),
    })
}

struct SumOfSquares {
    between: f64,
    within: f64,
    df_between: f64,
    df_within: f64,
}

impl SumOfSquares {
    fn of(groups: &[&[f64]]) -> Result<Self, StatsError> {
        let total: usize = groups.iter().map(|g| g.len()).sum();
        if total <= groups.len() {
            return Err(StatsError::TooFewValues { needed: groups.len() + 1, got: total });
        }
        let grand = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / total as f64;
        let mut between = 0.0;
        let mut within = 0.0;
        for g in groups {
            let m = mean(g);
            between += g.len() as f64 * (m - grand).powi(2);
            within += g.iter().map(|v| (v - m).powi(2)).sum::<f64>();
        }
        Ok(Self {
            between,
            within,
            df_between: (groups.len() - 1) as f64,
            df_within: (total - groups.len()) as f64,
        })
    }

    fn f(&self) -> f64 {
        (self.between / self.df_between) / (self.within / self.df_within)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anova {
    pub f_statistic: f64,
    pub p_value: f64,
    pub eta_squared: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub ms_within: f64,
}

pub fn one_way_anova(groups: &[&[f64]]) -> Result<Anova, StatsError> {
    check_groups(groups)?;
    let table = SumOfSquares::of(groups)?;
    let total = table.between + table.within;
    if total <= 0.0 {
        return Err(StatsError::NoVariation);
    }
    let (f, p) = if table.within <= 0.0 {
        (f64::INFINITY, 0.0)
    } else {
        let f = table.f();
        (f, f_sf(f, table.df_between, table.df_within))
    };
    Ok(Anova {
        f_statistic: f,
        p_value: p,
        eta_squared: table.between / total,
        df_between: table.df_between,
        df_within: table.df_within,
        ms_within: table.within / table.df_within,
    })
}

/// Average ranks (1-based) with ties sharing the mean rank, plus the tie
/// correction term `sum(t^3 - t)`.
fn rank_with_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut ties = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = rank;
        }
        let t = (j - i + 1) as f64;
        ties += t * t * t - t;
        i = j + 1;
    }
    (ranks, ties)
}

/// Kruskal-Wallis H with the tie correction.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Result<TestResult, StatsError> {
    check_groups(groups)?;
    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = pooled.len() as f64;
    let (ranks, ties) = rank_with_ties(&pooled);

    let mut offset = 0;
    let mut sum = 0.0;
    for g in groups {
        let r: f64 = ranks[offset..offset + g.len()].iter().sum();
        sum += r * r / g.len() as f64;
        offset += g.len();
    }
    let h = 12.0 / (n * (n + 1.0)) * sum - 3.0 * (n + 1.0);
    let correction = 1.0 - ties / (n * n * n - n);
    if correction <= 0.0 {
        return Err(StatsError::NoVariation);
    }
    let h = h / correction;
    Ok(TestResult {
        statistic: h,
        p_value: chi2_sf(h, (groups.len() - 1) as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    const LOW: [f64; 3] = [1.0, 2.0, 3.0];
    const MID: [f64; 3] = [3.0, 4.0, 5.0];
    const HIGH: [f64; 3] = [5.0, 6.0, 7.0];

    #[test]
    fn describe_uses_linear_quartiles() {
        let d = describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(d.count, 4);
        assert!(close(d.mean, 2.5, 1e-12));
        assert!(close(d.q25, 1.75, 1e-12));
        assert!(close(d.q50, 2.5, 1e-12));
        assert!(close(d.q75, 3.25, 1e-12));
        assert!(close(d.std.unwrap(), 1.290_994_448_735_805_6, 1e-12));
        assert_eq!((d.min, d.max), (1.0, 4.0));
    }

    #[test]
    fn single_value_has_no_sd() {
        let d = describe(&[70.0]).unwrap();
        assert_eq!(d.std, None);
        assert_eq!(d.q25, 70.0);
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn anova_reference_values() {
        let r = one_way_anova(&[&LOW, &MID, &HIGH]).unwrap();
        assert!(close(r.f_statistic, 12.0, 1e-9));
        assert!(close(r.p_value, 0.008, 1e-9));
        assert!(close(r.eta_squared, 0.8, 1e-12));
        assert!(close(r.ms_within, 1.0, 1e-12));

        let r = one_way_anova(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]).unwrap();
        assert!(close(r.f_statistic, 27.0, 1e-9));
        assert!(close(r.p_value, 0.001, 1e-9));
        assert!(close(r.eta_squared, 0.9, 1e-12));
    }

    #[test]
    fn anova_rejects_constant_data() {
        assert_eq!(
            one_way_anova(&[&[2.0, 2.0], &[2.0, 2.0]]),
            Err(StatsError::NoVariation)
        );
        assert_eq!(one_way_anova(&[&LOW]), Err(StatsError::TooFewGroups(1)));
    }

    #[test]
    fn kruskal_without_ties() {
        let r = kruskal_wallis(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]).unwrap();
        assert!(close(r.statistic, 7.2, 1e-9));
        assert!(close(r.p_value, (-3.6f64).exp(), 1e-9));
    }

    #[test]
    fn kruskal_corrects_for_ties() {
        // Uncorrected H is 2.4; the tie factor is 0.8.
        let r = kruskal_wallis(&[&[1.0, 1.0], &[2.0, 2.0]]).unwrap();
        assert!(close(r.statistic, 3.0, 1e-9));
        assert!(close(r.p_value, 0.083_264_516_663_550_1, 1e-8));
    }

    #[test]
    fn levene_centres_on_medians() {
        let r = levene(&[&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]]).unwrap();
        assert!(close(r.statistic, 0.8, 1e-12));

        let r = levene(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]).unwrap();
        assert!(close(r.statistic, 0.0, 1e-12));
        assert!(close(r.p_value, 1.0, 1e-12));
    }

    #[test]
    fn shapiro_three_values_is_exact() {
        let r = shapiro_wilk(&[1.0, 2.0, 4.0]).unwrap();
        assert!(close(r.statistic, 0.964_285_714, 1e-6));
        assert!(close(r.p_value, 0.636_9, 1e-3));
    }

    #[test]
    fn shapiro_equally_spaced_three_values_is_perfect() {
        let r = shapiro_wilk(&[10.0, 20.0, 30.0]).unwrap();
        assert!(close(r.statistic, 1.0, 1e-12));
        assert!(close(r.p_value, 1.0, 1e-9));
    }

    #[test]
    fn shapiro_larger_sample_is_plausible() {
        let values = [2.1, 3.4, 1.9, 5.6, 4.4, 3.8, 2.7, 4.9, 3.1, 4.0, 3.6, 2.5, 4.7];
        let r = shapiro_wilk(&values).unwrap();
        assert!(r.statistic > 0.9 && r.statistic <= 1.0);
        assert!(r.p_value > 0.05 && r.p_value <= 1.0);
    }

    #[test]
    fn shapiro_rejects_small_or_flat_samples() {
        assert_eq!(
            shapiro_wilk(&[1.0, 2.0]),
            Err(StatsError::TooFewValues { needed: 3, got: 2 })
        );
        assert_eq!(shapiro_wilk(&[5.0, 5.0, 5.0]), Err(StatsError::NoVariation));
    }
}
