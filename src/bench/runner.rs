//! Sequential benchmark runner

use super::{BenchmarkCase, PerformanceTier, ThroughputUnit};
use crate::progress::ProgressReporter;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What happened when a case ran
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BenchmarkOutcome {
    /// The workload ran to completion
    Completed {
        /// Measured wall time (monotonic clock)
        #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
        duration: Duration,
        /// Derived rate, absent for a zero duration
        throughput: Option<f64>,
        /// Duration tier
        tier: PerformanceTier,
        /// Checksum returned by the workload
        checksum: u64,
    },
    /// The workload returned an error or panicked
    Failed {
        /// Why the case failed
        reason: String,
        /// Time spent before failing
        #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
        elapsed: Duration,
    },
}

/// Measured result of one case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    /// Case name
    pub name: String,
    /// Throughput unit
    pub unit: ThroughputUnit,
    /// Outcome
    #[serde(flatten)]
    pub outcome: BenchmarkOutcome,
}

impl BenchmarkResult {
    /// Whether the workload completed
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, BenchmarkOutcome::Completed { .. })
    }

    /// Measured duration of a completed case
    pub fn duration(&self) -> Option<Duration> {
        match self.outcome {
            BenchmarkOutcome::Completed { duration, .. } => Some(duration),
            BenchmarkOutcome::Failed { .. } => None,
        }
    }

    /// Derived throughput of a completed case
    pub fn throughput(&self) -> Option<f64> {
        match self.outcome {
            BenchmarkOutcome::Completed { throughput, .. } => throughput,
            BenchmarkOutcome::Failed { .. } => None,
        }
    }

    /// Tier of a completed case
    pub fn tier(&self) -> Option<PerformanceTier> {
        match self.outcome {
            BenchmarkOutcome::Completed { tier, .. } => Some(tier),
            BenchmarkOutcome::Failed { .. } => None,
        }
    }
}

/// Runs cases one after another on the calling thread
///
/// Running on the caller's thread keeps cases from contending with each
/// other for cores, so their durations stay comparable.
#[derive(Default)]
pub struct BenchmarkRunner {
    progress: Option<Arc<ProgressReporter>>,
}

impl BenchmarkRunner {
    /// Create a runner
    pub fn new() -> Self {
        Self::default()
    }

    /// Report each case to a progress display
    pub fn with_progress(mut self, progress: Arc<ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run every case in order, one result per case
    pub fn run(&self, cases: &[BenchmarkCase]) -> Vec<BenchmarkResult> {
        if let Some(progress) = &self.progress {
            progress.start_benchmarks(cases.len() as u64);
        }
        cases.iter().map(|case| self.run_case(case)).collect()
    }

    /// Run a single case
    pub fn run_case(&self, case: &BenchmarkCase) -> BenchmarkResult {
        if let Some(progress) = &self.progress {
            progress.case_started(&case.name);
        }

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| case.execute()));
        let elapsed = start.elapsed();

        let outcome = match outcome {
            Ok(Ok(checksum)) => {
                let checksum = std::hint::black_box(checksum);
                let tier = PerformanceTier::from_duration(elapsed);
                tracing::info!(case = %case.name, ?elapsed, %tier, "Benchmark completed");
                BenchmarkOutcome::Completed {
                    duration: elapsed,
                    throughput: case.unit.throughput(case.work_units, elapsed),
                    tier,
                    checksum,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(case = %case.name, error = %e, "Benchmark failed");
                BenchmarkOutcome::Failed {
                    reason: e.to_string(),
                    elapsed,
                }
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::warn!(case = %case.name, %reason, "Benchmark panicked");
                BenchmarkOutcome::Failed {
                    reason: format!("workload panicked: {}", reason),
                    elapsed,
                }
            }
        };

        if let Some(progress) = &self.progress {
            progress.case_finished(&case.name, matches!(outcome, BenchmarkOutcome::Completed { .. }));
        }

        BenchmarkResult {
            name: case.name.clone(),
            unit: case.unit,
            outcome,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
