use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic session clock with nanosecond timestamps.
pub trait Timer: Clone {
    /// Nanoseconds since the timer was created.
    fn now(&self) -> u64;
    fn sleep(&self, d: Duration);

    fn elapsed(&self, since: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(since))
    }
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // Resume after signal interruptions until the full interval elapsed.
        loop {
            let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) };
            if rc != libc::EINTR {
                break;
            }
            req = rem;
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic clock: only moves when slept on or advanced. Clones share
/// the same clock.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

/// Summary of measured intervals, e.g. realized stimulus durations.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationStats {
    pub samples: usize,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Population standard deviation.
    pub jitter: Duration,
}

impl DurationStats {
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;
        let times_ns: Vec<f64> = samples.iter().map(|d| d.as_nanos() as f64).collect();
        let n = times_ns.len() as f64;
        let avg = times_ns.iter().sum::<f64>() / n;
        let variance = times_ns.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;

        Some(DurationStats {
            samples: samples.len(),
            mean: Duration::from_nanos(avg.round() as u64),
            min,
            max,
            jitter: Duration::from_nanos(variance.sqrt().round() as u64),
        })
    }

    /// Signed difference between the mean and a target, in milliseconds.
    pub fn mean_error_ms(&self, target: Duration) -> f64 {
        (self.mean.as_secs_f64() - target.as_secs_f64()) * 1e3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timer_clones_share_one_clock() {
        let timer = ManualTimer::new();
        let other = timer.clone();
        timer.sleep(Duration::from_millis(300));
        other.advance(Duration::from_micros(5));
        assert_eq!(timer.now(), 300_005_000);
        assert_eq!(other.elapsed(300_000_000), Duration::from_micros(5));
    }

    #[test]
    fn stats_cover_mean_spread_and_bounds() {
        let samples = [
            Duration::from_millis(2500),
            Duration::from_millis(2510),
            Duration::from_millis(2490),
        ];
        let stats = DurationStats::from_samples(&samples).unwrap();
        assert_eq!(stats.samples, 3);
        assert_eq!(stats.mean, Duration::from_millis(2500));
        assert_eq!(stats.min, Duration::from_millis(2490));
        assert_eq!(stats.max, Duration::from_millis(2510));
        // sqrt(200/3) ms
        assert!((stats.jitter.as_secs_f64() * 1e3 - 8.165).abs() < 0.01);
        assert!(stats.mean_error_ms(Duration::from_millis(2500)).abs() < 1e-9);
    }

    #[test]
    fn stats_of_nothing_is_none() {
        assert!(DurationStats::from_samples(&[]).is_none());
    }

    #[test]
    fn high_precision_sleep_waits_at_least_the_interval() {
        let timer = HighPrecisionTimer::new();
        let before = timer.now();
        timer.sleep(Duration::from_millis(2));
        assert!(timer.elapsed(before) >= Duration::from_millis(2));
    }
}
