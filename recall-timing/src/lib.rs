pub mod timer;

pub use timer::{DurationStats, HighPrecisionTimer, ManualTimer, Timer};
