//! Theoretical core power and runner classification

use super::{BenchmarkResult, PerformanceTier};
use crate::profile::{ids, HostProfile};
use serde::Serialize;
use std::fmt;

/// Instructions-per-cycle assumptions the estimate is computed for
pub const IPC_ASSUMPTIONS: [u32; 4] = [1, 2, 3, 4];

/// Name of the case whose tier is the headline rating
pub const HEADLINE_CASE: &str = "arithmetic";

/// Peak GFLOPS at one IPC assumption
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IpcEstimate {
    /// Instructions per cycle
    pub ipc: u32,
    /// cores × MHz × IPC / 1000
    pub gflops: f64,
}

/// Back-of-envelope compute capacity: cores × clock × IPC
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorePowerEstimate {
    /// Logical cores
    pub cores: u64,
    /// Clock used for the estimate
    pub clock_mhz: f64,
    /// Fact the clock was taken from
    pub clock_fact: String,
    /// Peak GFLOPS per IPC assumption
    pub peak: Vec<IpcEstimate>,
    /// GFLOPS of one core at IPC 1
    pub per_core_gflops: f64,
}

impl CorePowerEstimate {
    /// Compute from explicit inputs; `None` when either is zero
    pub fn from_inputs(cores: u64, clock_mhz: f64, clock_fact: impl Into<String>) -> Option<Self> {
        if cores == 0 || clock_mhz.is_nan() || clock_mhz <= 0.0 {
            return None;
        }
        let peak = IPC_ASSUMPTIONS
            .iter()
            .map(|&ipc| IpcEstimate {
                ipc,
                gflops: cores as f64 * clock_mhz * ipc as f64 / 1000.0,
            })
            .collect();

        Some(Self {
            cores,
            clock_mhz,
            clock_fact: clock_fact.into(),
            peak,
            per_core_gflops: clock_mhz / 1000.0,
        })
    }

    /// Compute from a profile, preferring the average clock over the maximum
    pub fn from_profile(profile: &HostProfile) -> Option<Self> {
        let cores = profile.u64(ids::CPU_LOGICAL_CORES)?;
        let (clock_fact, clock_mhz) = [ids::CPU_AVG_FREQ_MHZ, ids::CPU_MAX_FREQ_MHZ]
            .into_iter()
            .find_map(|id| profile.f64(id).filter(|&mhz| mhz > 0.0).map(|mhz| (id, mhz)))?;
        Self::from_inputs(cores, clock_mhz, clock_fact)
    }

    /// Peak GFLOPS at a given IPC, if it was computed
    pub fn gflops_at(&self, ipc: u32) -> Option<f64> {
        self.peak.iter().find(|e| e.ipc == ipc).map(|e| e.gflops)
    }
}

/// Runner size class by logical core count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerClass {
    /// 4 or more cores
    Standard,
    /// 2 or 3 cores
    Small,
    /// A single core
    Limited,
}

impl RunnerClass {
    /// Classify a core count
    pub fn from_logical_cores(cores: u64) -> Self {
        if cores >= 4 {
            RunnerClass::Standard
        } else if cores >= 2 {
            RunnerClass::Small
        } else {
            RunnerClass::Limited
        }
    }

    /// Classify a profile; `None` when the core count is unavailable
    pub fn from_profile(profile: &HostProfile) -> Option<Self> {
        profile.u64(ids::CPU_LOGICAL_CORES).map(Self::from_logical_cores)
    }

    /// Report label
    pub fn label(&self) -> &'static str {
        match self {
            RunnerClass::Standard => "standard (4+ cores)",
            RunnerClass::Small => "small (2+ cores)",
            RunnerClass::Limited => "limited",
        }
    }
}

impl fmt::Display for RunnerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tier of the arithmetic case, the run's overall rating
pub fn headline_rating(results: &[BenchmarkResult]) -> Option<PerformanceTier> {
    results
        .iter()
        .find(|r| r.name == HEADLINE_CASE)
        .and_then(BenchmarkResult::tier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{BenchmarkOutcome, ThroughputUnit};
    use crate::probe::{Fact, FactValue, FnSource};
    use crate::profile::{FactDeclaration, ProfileBuilder};
    use std::time::Duration;

    fn profile(facts: &[(&str, FactValue)]) -> HostProfile {
        let declarations: Vec<FactDeclaration> = facts
            .iter()
            .map(|(id, value)| {
                let value = value.clone();
                FactDeclaration::new(Fact::new(*id, value.kind()))
                    .source(FnSource::new("fixed", move || Ok(value.clone())))
            })
            .collect();
        ProfileBuilder::new().build(&declarations).unwrap()
    }

    #[test]
    fn test_estimate_arithmetic() {
        let estimate = CorePowerEstimate::from_inputs(4, 2500.0, ids::CPU_AVG_FREQ_MHZ).unwrap();
        assert_eq!(estimate.gflops_at(1), Some(10.0));
        assert_eq!(estimate.gflops_at(4), Some(40.0));
        assert_eq!(estimate.per_core_gflops, 2.5);
        assert_eq!(estimate.peak.len(), 4);
        assert!(CorePowerEstimate::from_inputs(0, 2500.0, "x").is_none());
        assert!(CorePowerEstimate::from_inputs(4, 0.0, "x").is_none());
    }

    #[test]
    fn test_estimate_prefers_average_clock() {
        let p = profile(&[
            (ids::CPU_LOGICAL_CORES, FactValue::Integer(2)),
            (ids::CPU_AVG_FREQ_MHZ, FactValue::Float(2445.5)),
            (ids::CPU_MAX_FREQ_MHZ, FactValue::Integer(3500)),
        ]);
        let estimate = CorePowerEstimate::from_profile(&p).unwrap();
        assert_eq!(estimate.clock_fact, ids::CPU_AVG_FREQ_MHZ);
        assert_eq!(estimate.clock_mhz, 2445.5);
    }

    #[test]
    fn test_estimate_falls_back_to_max_clock() {
        let p = profile(&[
            (ids::CPU_LOGICAL_CORES, FactValue::Integer(2)),
            (ids::CPU_MAX_FREQ_MHZ, FactValue::Integer(3000)),
        ]);
        let estimate = CorePowerEstimate::from_profile(&p).unwrap();
        assert_eq!(estimate.clock_fact, ids::CPU_MAX_FREQ_MHZ);
        assert_eq!(estimate.gflops_at(2), Some(12.0));

        let no_clock = profile(&[(ids::CPU_LOGICAL_CORES, FactValue::Integer(2))]);
        assert!(CorePowerEstimate::from_profile(&no_clock).is_none());
    }

    #[test]
    fn test_runner_class_thresholds() {
        assert_eq!(RunnerClass::from_logical_cores(1), RunnerClass::Limited);
        assert_eq!(RunnerClass::from_logical_cores(2), RunnerClass::Small);
        assert_eq!(RunnerClass::from_logical_cores(3), RunnerClass::Small);
        assert_eq!(RunnerClass::from_logical_cores(4), RunnerClass::Standard);
        assert_eq!(RunnerClass::from_logical_cores(64).label(), "standard (4+ cores)");

        let unknown = profile(&[(ids::CPU_MODEL, FactValue::from("x"))]);
        assert_eq!(RunnerClass::from_profile(&unknown), None);
    }

    #[test]
    fn test_headline_rating_uses_arithmetic_case() {
        let completed = |name: &str, ms: u64| BenchmarkResult {
            name: name.to_string(),
            unit: ThroughputUnit::OpsPerSec,
            outcome: BenchmarkOutcome::Completed {
                duration: Duration::from_millis(ms),
                throughput: None,
                tier: PerformanceTier::from_duration(Duration::from_millis(ms)),
                checksum: 0,
            },
        };

        let results = vec![completed("sort", 10), completed("arithmetic", 150)];
        assert_eq!(headline_rating(&results), Some(PerformanceTier::Good));
        assert_eq!(headline_rating(&results[..1]), None);
    }
}
