//! Studentized range distribution and Tukey's HSD.
//!
//! The range CDF is the double Gauss-Legendre quadrature of Copenhaver and
//! Holland (1988), integrating the normal range probability over the
//! scaled chi density of the error term.

use serde::Serialize;

use crate::special::{ln_gamma, norm_cdf};
use crate::stats::{StatsError, mean, one_way_anova};

const XLEG: [f64; 6] = [
    0.981_560_634_246_719_250_690_549_090_149,
    0.904_117_256_370_474_856_678_465_866_119,
    0.769_902_674_194_304_687_036_893_833_213,
    0.587_317_954_286_617_447_296_702_418_941,
    0.367_831_498_998_180_193_752_691_536_644,
    0.125_233_408_511_468_915_472_441_369_464,
];
const ALEG: [f64; 6] = [
    0.047_175_336_386_511_827_194_615_961_485,
    0.106_939_325_995_318_430_960_254_718_194,
    0.160_078_328_543_346_226_334_652_529_543,
    0.203_167_426_723_065_921_749_064_455_810,
    0.233_492_536_538_354_808_760_849_898_925,
    0.249_147_045_813_402_785_000_562_436_043,
];

const XLEGQ: [f64; 8] = [
    0.989_400_934_991_649_932_596_154_173_450,
    0.944_575_023_073_232_576_077_988_415_535,
    0.865_631_202_387_831_743_880_467_897_712,
    0.755_404_408_355_003_033_895_101_194_847,
    0.617_876_244_402_643_748_446_671_764_049,
    0.458_016_777_657_227_386_342_419_442_984,
    0.281_603_550_779_258_913_230_460_501_460,
    0.950_125_098_376_374_401_853_193_354_250e-1,
];
const ALEGQ: [f64; 8] = [
    0.271_524_594_117_540_948_517_805_724_560e-1,
    0.622_535_239_386_478_928_628_438_369_944e-1,
    0.951_585_116_824_927_848_099_251_076_022e-1,
    0.124_628_971_255_533_872_052_476_282_192,
    0.149_595_988_816_576_732_081_501_730_547,
    0.169_156_519_395_002_538_189_312_079_030,
    0.182_603_415_044_923_588_866_763_667_969,
    0.189_450_610_455_068_496_285_396_723_208,
];

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_677_939_946_059_934;

/// Probability that the range of `k` standard normals is below `w`.
fn range_prob(w: f64, k: f64) -> f64 {
    const UPPER: f64 = 8.0;
    let half = w * 0.5;
    if half >= UPPER {
        return 1.0;
    }

    let mut pr_w = 2.0 * norm_cdf(half) - 1.0;
    pr_w = if pr_w >= (-50.0 / k).exp() { pr_w.powf(k) } else { 0.0 };

    let intervals = if w > 3.0 { 2 } else { 3 };
    let step = (UPPER - half) / intervals as f64;
    let mut lower = half;
    let mut upper = half + step;
    let k1 = k - 1.0;
    let mut integral = 0.0;

    for _ in 0..intervals {
        let mid = 0.5 * (upper + lower);
        let radius = 0.5 * (upper - lower);
        let mut sum = 0.0;
        for jj in 0..12 {
            let (x, weight) = if jj < 6 {
                (-XLEG[jj], ALEG[jj])
            } else {
                (XLEG[11 - jj], ALEG[11 - jj])
            };
            let ac = mid + radius * x;
            let expo = ac * ac;
            if expo > 60.0 {
                break;
            }
            let inner = norm_cdf(ac) - norm_cdf(ac - w);
            if inner >= (-30.0 / k1).exp() {
                sum += weight * (-0.5 * expo).exp() * inner.powf(k1);
            }
        }
        integral += sum * 2.0 * radius * k * INV_SQRT_2PI;
        lower = upper;
        upper += step;
    }

    pr_w += integral;
    if pr_w <= (-30.0f64).exp() {
        return 0.0;
    }
    pr_w.min(1.0)
}

/// CDF of the studentized range for `k` means and `df` error degrees of
/// freedom.
pub fn ptukey(q: f64, k: usize, df: f64) -> f64 {
    if q <= 0.0 {
        return 0.0;
    }
    if !q.is_finite() {
        return 1.0;
    }
    let k = k as f64;
    if df > 25_000.0 {
        return range_prob(q, k);
    }

    let f2 = df * 0.5;
    let mut f2lf = f2 * df.ln() - df * std::f64::consts::LN_2 - ln_gamma(f2);
    let f21 = f2 - 1.0;
    let ff4 = df * 0.25;
    let ulen = if df <= 100.0 {
        1.0
    } else if df <= 800.0 {
        0.5
    } else if df <= 5000.0 {
        0.25
    } else {
        0.125
    };
    f2lf += f64::ln(ulen);

    let mut ans = 0.0;
    for i in 1..=50 {
        let mut interval = 0.0;
        let center = (2 * i - 1) as f64 * ulen;
        for jj in 0..16 {
            let (j, offset) = if jj < 8 {
                (jj, -XLEGQ[jj] * ulen)
            } else {
                (jj - 8, XLEGQ[jj - 8] * ulen)
            };
            let u = center + offset;
            let t1 = f2lf + f21 * u.ln() - u * ff4;
            if t1 >= -30.0 {
                let scaled = q * (u * 0.5).sqrt();
                interval += range_prob(scaled, k) * ALEGQ[j] * t1.exp();
            }
        }
        if i as f64 * ulen >= 1.0 && interval <= 1e-14 {
            break;
        }
        ans += interval;
    }
    ans.min(1.0)
}

/// Upper quantile of the studentized range, by bisection on [`ptukey`].
pub fn qtukey(p: f64, k: usize, df: f64) -> f64 {
    let (mut lo, mut hi) = (0.0, 1.0);
    while ptukey(hi, k, df) < p && hi < 1e3 {
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        if ptukey(mid, k, df) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-9 {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// One pairwise comparison; the difference is `mean(b) - mean(a)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TukeyPair {
    pub a: usize,
    pub b: usize,
    pub mean_diff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// Tukey's honestly significant difference for every pair of groups,
/// with the Tukey-Kramer standard error for unequal sizes.
pub fn tukey_hsd(groups: &[&[f64]], alpha: f64) -> Result<Vec<TukeyPair>, StatsError> {
    let anova = one_way_anova(groups)?;
    if anova.df_within < 2.0 {
        return Err(StatsError::DegreesOfFreedom);
    }
    if anova.ms_within <= 0.0 {
        return Err(StatsError::NoVariation);
    }
    let k = groups.len();
    let critical = qtukey(1.0 - alpha, k, anova.df_within);
    let means: Vec<f64> = groups.iter().map(|g| mean(g)).collect();

    let mut pairs = Vec::new();
    for a in 0..k {
        for b in a + 1..k {
            let se = (anova.ms_within / 2.0
                * (1.0 / groups[a].len() as f64 + 1.0 / groups[b].len() as f64))
                .sqrt();
            let diff = means[b] - means[a];
            let q = diff.abs() / se;
            let p_adj = (1.0 - ptukey(q, k, anova.df_within)).clamp(0.0, 1.0);
            pairs.push(TukeyPair {
                a,
                b,
                mean_diff: diff,
                p_adj,
                lower: diff - critical * se,
                upper: diff + critical * se,
                reject: p_adj < alpha,
            });
        }
    }
    Ok(pairs)
}
