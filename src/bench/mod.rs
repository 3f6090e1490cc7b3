//! CPU micro-benchmarks
//!
//! A fixed battery of CPU-bound workloads timed with a monotonic clock,
//! rated against fixed duration tiers, plus the derived core-power
//! estimate and runner class.

mod case;
mod estimate;
mod runner;
mod tier;
mod workloads;

pub use case::*;
pub use estimate::*;
pub use runner::*;
pub use tier::*;
pub use workloads::{arithmetic, default_battery, fibonacci, primes, sort};
