//! Benchmark case definition

use crate::error::WorkloadError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a case's throughput is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThroughputUnit {
    /// Operations per second
    OpsPerSec,
    /// Items processed per second
    ItemsPerSec,
    /// Wall time in milliseconds (lower is better)
    Milliseconds,
}

impl ThroughputUnit {
    /// Short unit label
    pub fn label(&self) -> &'static str {
        match self {
            ThroughputUnit::OpsPerSec => "ops/s",
            ThroughputUnit::ItemsPerSec => "items/s",
            ThroughputUnit::Milliseconds => "ms",
        }
    }

    /// Derive throughput for `work_units` done in `duration`
    ///
    /// `None` for a zero duration, where a rate is meaningless.
    pub fn throughput(&self, work_units: u64, duration: Duration) -> Option<f64> {
        if duration.is_zero() {
            return None;
        }
        match self {
            ThroughputUnit::OpsPerSec | ThroughputUnit::ItemsPerSec => {
                Some(work_units as f64 / duration.as_secs_f64())
            }
            ThroughputUnit::Milliseconds => Some(duration.as_secs_f64() * 1000.0),
        }
    }
}

/// A CPU workload returning a checksum of its result
pub type Workload = Box<dyn Fn() -> Result<u64, WorkloadError> + Send + Sync>;

/// One named, timed workload
pub struct BenchmarkCase {
    /// Case name (`arithmetic`, `sort`)
    pub name: String,
    /// Throughput unit
    pub unit: ThroughputUnit,
    /// Operations or items the workload performs, for rate units
    pub work_units: u64,
    workload: Workload,
}

impl BenchmarkCase {
    /// Define a case
    pub fn new<F>(name: impl Into<String>, unit: ThroughputUnit, work_units: u64, workload: F) -> Self
    where
        F: Fn() -> Result<u64, WorkloadError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            unit,
            work_units,
            workload: Box::new(workload),
        }
    }

    /// Run the workload once
    pub fn execute(&self) -> Result<u64, WorkloadError> {
        (self.workload)()
    }
}

impl fmt::Debug for BenchmarkCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkCase")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("work_units", &self.work_units)
            .finish_non_exhaustive()
    }
}
