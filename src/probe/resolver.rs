//! Tiered resolution of one fact across ordered sources

use super::{Fact, FactValue, UnavailableReason, ValueSource};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Outcome of one attempt during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The source produced a value of the right kind
    Succeeded,
    /// The source could not produce a value
    Failed(UnavailableReason),
}

/// Diagnostic record of one source attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    /// Source label
    pub source: String,
    /// What happened
    pub outcome: AttemptOutcome,
    /// Time spent in the source
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

/// Final state of a fact
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// A source produced the value
    Resolved {
        /// The value
        value: FactValue,
        /// Label of the source that produced it
        source: String,
    },
    /// Every source failed (or there were none)
    Unavailable {
        /// Reason reported by the last attempted source
        reason: UnavailableReason,
    },
}

/// A fact paired with its resolution and the attempts that led there
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    /// The fact
    pub fact: Fact,
    /// Value or reason
    pub resolution: Resolution,
    /// Every attempt, in the order made
    pub attempts: Vec<AttemptRecord>,
}

impl ResolutionResult {
    /// Fact identifier
    pub fn id(&self) -> &str {
        &self.fact.id
    }

    /// Resolved value, if any
    pub fn value(&self) -> Option<&FactValue> {
        match &self.resolution {
            Resolution::Resolved { value, .. } => Some(value),
            Resolution::Unavailable { .. } => None,
        }
    }

    /// Label of the source that succeeded, if any
    pub fn source_used(&self) -> Option<&str> {
        match &self.resolution {
            Resolution::Resolved { source, .. } => Some(source),
            Resolution::Unavailable { .. } => None,
        }
    }

    /// Why the fact is unavailable, if it is
    pub fn reason(&self) -> Option<UnavailableReason> {
        match &self.resolution {
            Resolution::Resolved { .. } => None,
            Resolution::Unavailable { reason } => Some(*reason),
        }
    }

    /// Whether a value was resolved
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved { .. })
    }

    /// Total time spent across attempts
    pub fn elapsed(&self) -> Duration {
        self.attempts.iter().map(|a| a.elapsed).sum()
    }
}

/// Tries sources in order and stops at the first success
///
/// Sources are attempted strictly in slice order, so repeated calls
/// against unchanged host state try the same sources and return the
/// same result. A value whose kind does not match the fact counts as
/// [`UnavailableReason::MalformedOutput`]. When every source fails, the
/// reason is the one reported by the last source attempted; an empty
/// source list is [`UnavailableReason::NotSupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TieredResolver;

impl TieredResolver {
    /// Create a resolver
    pub fn new() -> Self {
        Self
    }

    /// Resolve a fact from its ordered sources
    pub fn resolve(&self, fact: &Fact, sources: &[Box<dyn ValueSource>]) -> ResolutionResult {
        let mut attempts = Vec::with_capacity(sources.len());
        let mut last_reason = UnavailableReason::NotSupported;

        for (tier, source) in sources.iter().enumerate() {
            let start = Instant::now();
            let outcome = source.attempt().and_then(|value| {
                if value.kind() == fact.kind {
                    Ok(value)
                } else {
                    tracing::debug!(fact = %fact.id, source = source.name(), expected = ?fact.kind, got = ?value.kind(), "Source returned wrong kind");
                    Err(UnavailableReason::MalformedOutput)
                }
            });
            let elapsed = start.elapsed();

            match outcome {
                Ok(value) => {
                    tracing::debug!(fact = %fact.id, tier, source = source.name(), ?elapsed, "Fact resolved");
                    attempts.push(AttemptRecord {
                        source: source.name().to_string(),
                        outcome: AttemptOutcome::Succeeded,
                        elapsed,
                    });
                    return ResolutionResult {
                        fact: fact.clone(),
                        resolution: Resolution::Resolved {
                            value,
                            source: source.name().to_string(),
                        },
                        attempts,
                    };
                }
                Err(reason) => {
                    tracing::debug!(fact = %fact.id, tier, source = source.name(), %reason, ?elapsed, "Source unavailable");
                    attempts.push(AttemptRecord {
                        source: source.name().to_string(),
                        outcome: AttemptOutcome::Failed(reason),
                        elapsed,
                    });
                    last_reason = reason;
                }
            }
        }

        ResolutionResult {
            fact: fact.clone(),
            resolution: Resolution::Unavailable { reason: last_reason },
            attempts,
        }
    }
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
