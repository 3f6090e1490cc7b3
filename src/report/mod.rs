//! Report rendering
//!
//! A [`Report`] gathers everything one run produced: the host profile,
//! the benchmark results, and the figures derived from them. Renderers
//! only read it.

mod json;
mod text;

pub use json::*;
pub use text::*;

use crate::bench::{headline_rating, BenchmarkResult, CorePowerEstimate, PerformanceTier, RunnerClass};
use crate::environment::EnvironmentDescriptor;
use crate::profile::HostProfile;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything produced by one run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// When the report was assembled
    pub timestamp: DateTime<Utc>,
    /// Crate version that produced it
    pub version: &'static str,
    /// Resolved host facts, when profiling ran
    pub profile: Option<HostProfile>,
    /// Benchmark results, when benchmarks ran
    pub benchmarks: Vec<BenchmarkResult>,
    /// Theoretical core power
    pub core_power: Option<CorePowerEstimate>,
    /// Runner class by core count
    pub runner_class: Option<RunnerClass>,
    /// Tier of the arithmetic case
    pub rating: Option<PerformanceTier>,
    /// CI provider and container runtime
    pub environment: Option<EnvironmentDescriptor>,
}

impl Report {
    /// Assemble a report and derive the summary figures
    pub fn new(profile: Option<HostProfile>, benchmarks: Vec<BenchmarkResult>) -> Self {
        let core_power = profile.as_ref().and_then(CorePowerEstimate::from_profile);
        let runner_class = profile.as_ref().and_then(RunnerClass::from_profile);
        let environment = profile.as_ref().map(EnvironmentDescriptor::from_profile);
        let rating = headline_rating(&benchmarks);

        Self {
            timestamp: Utc::now(),
            version: crate::VERSION,
            profile,
            benchmarks,
            core_power,
            runner_class,
            rating,
            environment,
        }
    }
}
