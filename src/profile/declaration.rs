//! Fact declarations

use crate::probe::{Fact, ValueSource};
use std::fmt;

/// A fact together with its ordered sources and dependencies
///
/// Source order is priority order: index 0 is tried first.
pub struct FactDeclaration {
    /// The fact being declared
    pub fact: Fact,
    /// Sources, highest priority first
    pub sources: Vec<Box<dyn ValueSource>>,
    /// Ids of facts that must be resolved before this one
    pub depends_on: Vec<String>,
}

impl FactDeclaration {
    /// Declare a fact with no sources yet
    pub fn new(fact: Fact) -> Self {
        Self {
            fact,
            sources: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Append a source at the next-lower priority
    pub fn source(mut self, source: impl ValueSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Append several boxed sources in order
    pub fn sources(mut self, sources: impl IntoIterator<Item = Box<dyn ValueSource>>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Require another fact to be resolved first
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    /// Fact identifier
    pub fn id(&self) -> &str {
        &self.fact.id
    }

    /// Labels of the sources, in priority order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for FactDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactDeclaration")
            .field("fact", &self.fact)
            .field("sources", &self.source_names())
            .field("depends_on", &self.depends_on)
            .finish()
    }
}
