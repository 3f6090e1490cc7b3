//! Duration tiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const EXCELLENT_BELOW: Duration = Duration::from_millis(100);
const GOOD_BELOW: Duration = Duration::from_millis(200);
const ACCEPTABLE_BELOW: Duration = Duration::from_millis(400);

/// Qualitative rating of a case duration
///
/// Ordered from best to worst, so a longer duration never compares lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceTier {
    /// Under 100 ms
    Excellent,
    /// Under 200 ms
    Good,
    /// Under 400 ms
    Acceptable,
    /// 400 ms or more
    Degraded,
}

impl PerformanceTier {
    /// Tier for a measured duration
    pub fn from_duration(duration: Duration) -> Self {
        if duration < EXCELLENT_BELOW {
            PerformanceTier::Excellent
        } else if duration < GOOD_BELOW {
            PerformanceTier::Good
        } else if duration < ACCEPTABLE_BELOW {
            PerformanceTier::Acceptable
        } else {
            PerformanceTier::Degraded
        }
    }

    /// Upper-case label for reports
    pub fn label(&self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "EXCELLENT",
            PerformanceTier::Good => "GOOD",
            PerformanceTier::Acceptable => "ACCEPTABLE",
            PerformanceTier::Degraded => "DEGRADED",
        }
    }

    /// Likely cause, for the headline rating
    pub fn description(&self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "Well-provisioned, no throttling",
            PerformanceTier::Good => "Normal performance",
            PerformanceTier::Acceptable => "Some system load or throttling",
            PerformanceTier::Degraded => "Possible thermal throttling or overload",
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
