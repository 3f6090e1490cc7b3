//! The resolved host profile

use crate::probe::{AttemptRecord, FactKind, FactValue, Resolution, ResolutionResult, UnavailableReason, Unit};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::time::Duration;

/// Every declared fact with its resolution, in declaration order
///
/// Built once per run by [`ProfileBuilder`](super::ProfileBuilder) and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct HostProfile {
    entries: Vec<ResolutionResult>,
    build_time: Duration,
}

impl HostProfile {
    pub(crate) fn new(entries: Vec<ResolutionResult>, build_time: Duration) -> Self {
        Self { entries, build_time }
    }

    /// Number of facts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no facts were declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ResolutionResult> {
        self.entries.iter()
    }

    /// Fact ids in declaration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id())
    }

    /// Entries whose id starts with a prefix (`cpu.`, `tool.`)
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a ResolutionResult> + 'a {
        self.entries.iter().filter(move |e| e.id().starts_with(prefix))
    }

    /// Entry for a fact
    pub fn get(&self, id: &str) -> Option<&ResolutionResult> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Resolved value of a fact
    pub fn value(&self, id: &str) -> Option<&FactValue> {
        self.get(id).and_then(ResolutionResult::value)
    }

    /// Integer value of a fact
    pub fn u64(&self, id: &str) -> Option<u64> {
        self.value(id).and_then(FactValue::as_u64)
    }

    /// Numeric value of a fact as float
    pub fn f64(&self, id: &str) -> Option<f64> {
        self.value(id).and_then(FactValue::as_f64)
    }

    /// Text value of a fact
    pub fn text(&self, id: &str) -> Option<&str> {
        self.value(id).and_then(FactValue::as_text)
    }

    /// Number of facts that resolved
    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_resolved()).count()
    }

    /// Facts that did not resolve, with their reasons
    pub fn unavailable(&self) -> impl Iterator<Item = (&str, UnavailableReason)> {
        self.entries.iter().filter_map(|e| e.reason().map(|r| (e.id(), r)))
    }

    /// Wall time spent building the profile
    pub fn build_time(&self) -> Duration {
        self.build_time
    }
}

#[derive(Serialize)]
struct EntryView<'a> {
    kind: FactKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<Unit>,
    #[serde(flatten)]
    resolution: &'a Resolution,
    attempts: &'a [AttemptRecord],
}

impl Serialize for HostProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            let view = EntryView {
                kind: entry.fact.kind,
                unit: entry.fact.unit,
                resolution: &entry.resolution,
                attempts: &entry.attempts,
            };
            map.serialize_entry(entry.id(), &view)?;
        }
        map.end()
    }
}
