//! Concurrent profile construction
//!
//! Declarations are validated up front. A fact is handed to a bounded
//! rayon pool as soon as its own dependencies have resolved, so a slow
//! fact only holds back the facts that depend on it. Results land in
//! slots indexed by declaration position, so the profile order never
//! depends on which thread finished first.

use super::{FactDeclaration, HostProfile};
use crate::config::{ProbeConfig, DEFAULT_MAX_PARALLELISM};
use crate::error::{ProbeError, Result};
use crate::probe::{ResolutionResult, TieredResolver};
use crate::progress::ProgressReporter;
use crossbeam::channel::unbounded;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Resolves a set of fact declarations into a [`HostProfile`]
pub struct ProfileBuilder {
    max_parallelism: usize,
    resolver: TieredResolver,
    progress: Option<Arc<ProgressReporter>>,
}

impl ProfileBuilder {
    /// Create a builder with the default concurrency cap
    pub fn new() -> Self {
        Self {
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            resolver: TieredResolver::new(),
            progress: None,
        }
    }

    /// Create a builder from runtime configuration
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new().with_max_parallelism(config.max_parallelism)
    }

    /// Cap the number of facts resolved at once (at least 1)
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism.max(1);
        self
    }

    /// Report each finished fact to a progress display
    pub fn with_progress(mut self, progress: Arc<ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Resolve every declaration
    ///
    /// Fails only when the declarations themselves are inconsistent or the
    /// worker pool cannot be created. Facts that cannot be read are
    /// recorded as unavailable in the profile.
    pub fn build(&self, declarations: &[FactDeclaration]) -> Result<HostProfile> {
        let start = Instant::now();
        let waves = plan_waves(declarations)?;

        if let Some(progress) = &self.progress {
            progress.start_facts(declarations.len() as u64);
        }
        if declarations.is_empty() {
            return Ok(HostProfile::new(Vec::new(), start.elapsed()));
        }

        let threads = declarations.len().min(self.max_parallelism).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("hostprobe-fact-{}", i))
            .build()
            .map_err(|e| ProbeError::ThreadPoolError(e.to_string()))?;

        let dependencies = dependency_indices(declarations)?;
        let mut pending: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); declarations.len()];
        for (index, deps) in dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(index);
            }
        }

        tracing::info!(facts = declarations.len(), depth = waves.len(), threads, "Resolving facts");

        let mut slots: Vec<Option<ResolutionResult>> = Vec::new();
        slots.resize_with(declarations.len(), || None);

        let (tx, rx) = unbounded();
        pool.in_place_scope(|scope| {
            let spawn = |index: usize| {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.resolve_one(&declarations[index])));
                    let _ = tx.send((index, outcome));
                });
            };

            let mut outstanding = 0usize;
            for index in (0..declarations.len()).filter(|&i| pending[i] == 0) {
                spawn(index);
                outstanding += 1;
            }

            while outstanding > 0 {
                let Ok((index, outcome)) = rx.recv() else {
                    break;
                };
                outstanding -= 1;

                let result = match outcome {
                    Ok(result) => result,
                    Err(payload) => panic::resume_unwind(payload),
                };
                tracing::debug!(fact = result.id(), elapsed = ?result.elapsed(), "Fact resolved");
                slots[index] = Some(result);

                for &dependent in &dependents[index] {
                    pending[dependent] -= 1;
                    if pending[dependent] == 0 {
                        spawn(dependent);
                        outstanding += 1;
                    }
                }
            }
        });

        let entries = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ProbeError::declaration("fact left unresolved by dependency plan"))?;

        let profile = HostProfile::new(entries, start.elapsed());
        tracing::info!(
            facts = profile.len(),
            resolved = profile.resolved_count(),
            elapsed = ?profile.build_time(),
            "Host profile built"
        );
        Ok(profile)
    }

    fn resolve_one(&self, declaration: &FactDeclaration) -> ResolutionResult {
        let result = self.resolver.resolve(&declaration.fact, &declaration.sources);
        if let Some(progress) = &self.progress {
            progress.fact_finished(result.id(), result.is_resolved());
        }
        result
    }
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Indices of each declaration's dependencies
///
/// Rejects duplicate ids and dependencies on undeclared facts.
fn dependency_indices(declarations: &[FactDeclaration]) -> Result<Vec<Vec<usize>>> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(declarations.len());
    for (index, declaration) in declarations.iter().enumerate() {
        if index_of.insert(declaration.id(), index).is_some() {
            return Err(ProbeError::declaration(format!("duplicate fact id '{}'", declaration.id())));
        }
    }

    declarations
        .iter()
        .map(|declaration| {
            declaration
                .depends_on
                .iter()
                .map(|dep| {
                    index_of.get(dep.as_str()).copied().ok_or_else(|| {
                        ProbeError::declaration(format!(
                            "fact '{}' depends on unknown fact '{}'",
                            declaration.id(),
                            dep
                        ))
                    })
                })
                .collect::<Result<Vec<usize>>>()
        })
        .collect()
}

/// Group declaration indices into waves whose dependencies all sit in
/// earlier waves
///
/// Used to validate a declaration set: duplicates, unknown dependencies
/// and cycles are rejected. Within a wave, indices keep declaration order.
pub fn plan_waves(declarations: &[FactDeclaration]) -> Result<Vec<Vec<usize>>> {
    let dependencies = dependency_indices(declarations)?;

    let mut level: Vec<Option<usize>> = vec![None; declarations.len()];
    let mut waves: Vec<Vec<usize>> = Vec::new();
    let mut placed = 0;

    while placed < declarations.len() {
        let current = waves.len();
        let wave: Vec<usize> = (0..declarations.len())
            .filter(|&i| level[i].is_none())
            .filter(|&i| dependencies[i].iter().all(|&d| level[d].is_some_and(|l| l < current)))
            .collect();

        if wave.is_empty() {
            let stuck: Vec<&str> = (0..declarations.len())
                .filter(|&i| level[i].is_none())
                .map(|i| declarations[i].id())
                .collect();
            return Err(ProbeError::declaration(format!("dependency cycle among facts: {}", stuck.join(", "))));
        }

        for &i in &wave {
            level[i] = Some(current);
        }
        placed += wave.len();
        waves.push(wave);
    }

    Ok(waves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::tests::CountingSource;
    use crate::probe::{Fact, FactValue, FnSource, UnavailableReason};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use std::time::Duration;

    fn integer(id: &str, value: u64) -> FactDeclaration {
        FactDeclaration::new(Fact::new(id, crate::probe::FactKind::Integer))
            .source(FnSource::new(format!("fixed:{}", id), move || Ok(FactValue::Integer(value))))
    }

    #[test]
    fn test_one_entry_per_declaration_in_order() {
        let declarations: Vec<FactDeclaration> = (0..20u64)
            .map(|i| {
                let fact = Fact::new(format!("test.fact{}", i), crate::probe::FactKind::Integer);
                if i % 3 == 0 {
                    FactDeclaration::new(fact).source(FnSource::new("failing", || Err(UnavailableReason::Timeout)))
                } else {
                    FactDeclaration::new(fact).source(FnSource::new("slow", move || {
                        std::thread::sleep(Duration::from_millis((20 - i) * 2));
                        Ok(FactValue::Integer(i))
                    }))
                }
            })
            .collect();

        let profile = ProfileBuilder::new().with_max_parallelism(4).build(&declarations).unwrap();

        assert_eq!(profile.len(), 20);
        let expected: Vec<String> = (0..20).map(|i| format!("test.fact{}", i)).collect();
        assert_eq!(profile.ids().map(str::to_string).collect::<Vec<_>>(), expected);
        assert_eq!(profile.get("test.fact3").and_then(|r| r.reason()), Some(UnavailableReason::Timeout));
        assert_eq!(profile.u64("test.fact4"), Some(4));
    }

    #[test]
    fn test_empty_declarations() {
        let profile = ProfileBuilder::new().build(&[]).unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn test_dependencies_resolve_before_dependents() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let record = |id: &'static str| {
            let order = Arc::clone(&order);
            FnSource::new(id, move || {
                order.lock().unwrap().push(id);
                Ok(FactValue::Integer(1))
            })
        };

        let declarations = vec![
            FactDeclaration::new(Fact::new("test.derived", crate::probe::FactKind::Integer))
                .source(record("derived"))
                .depends_on("test.base"),
            FactDeclaration::new(Fact::new("test.base", crate::probe::FactKind::Integer)).source(record("base")),
        ];

        assert_eq!(plan_waves(&declarations).unwrap(), vec![vec![1], vec![0]]);

        let profile = ProfileBuilder::new().build(&declarations).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["base", "derived"]);
        assert_eq!(profile.ids().collect::<Vec<_>>(), vec!["test.derived", "test.base"]);
    }

    #[test]
    fn test_slow_fact_does_not_hold_back_unrelated_dependents() {
        let started = Instant::now();
        let derived_at = Arc::new(Mutex::new(None));
        let recorded = Arc::clone(&derived_at);

        let declarations = vec![
            FactDeclaration::new(Fact::new("test.slow", crate::probe::FactKind::Integer)).source(FnSource::new(
                "slow",
                || {
                    std::thread::sleep(Duration::from_millis(600));
                    Ok(FactValue::Integer(1))
                },
            )),
            integer("test.base", 2),
            FactDeclaration::new(Fact::new("test.derived", crate::probe::FactKind::Integer))
                .source(FnSource::new("derived", move || {
                    *recorded.lock().unwrap() = Some(started.elapsed());
                    Ok(FactValue::Integer(3))
                }))
                .depends_on("test.base"),
        ];

        let profile = ProfileBuilder::new().with_max_parallelism(4).build(&declarations).unwrap();

        let derived_after = derived_at.lock().unwrap().expect("derived fact resolved");
        assert!(derived_after < Duration::from_millis(300), "derived started after {:?}", derived_after);
        assert_eq!(profile.u64("test.derived"), Some(3));
        assert_eq!(profile.u64("test.slow"), Some(1));
        assert_eq!(profile.ids().collect::<Vec<_>>(), vec!["test.slow", "test.base", "test.derived"]);
    }

    #[test]
    fn test_dependency_chain_with_single_thread() {
        let declarations = vec![
            integer("test.c", 3).depends_on("test.b"),
            integer("test.b", 2).depends_on("test.a"),
            integer("test.a", 1),
        ];
        let profile = ProfileBuilder::new().with_max_parallelism(1).build(&declarations).unwrap();
        assert_eq!(profile.resolved_count(), 3);
    }

    #[test]
    fn test_invalid_declarations_rejected() {
        let duplicate = vec![integer("test.a", 1), integer("test.a", 2)];
        assert!(matches!(plan_waves(&duplicate), Err(ProbeError::InvalidDeclaration(_))));

        let unknown = vec![integer("test.a", 1).depends_on("test.missing")];
        assert!(matches!(plan_waves(&unknown), Err(ProbeError::InvalidDeclaration(_))));

        let cycle = vec![
            integer("test.a", 1).depends_on("test.b"),
            integer("test.b", 2).depends_on("test.a"),
            integer("test.c", 3),
        ];
        let err = ProfileBuilder::new().build(&cycle).unwrap_err();
        assert!(err.to_string().contains("test.a"));
        assert!(!err.to_string().contains("test.c"));
    }

    #[test]
    fn test_sources_not_invoked_when_declarations_invalid() {
        let (source, calls) = CountingSource::new("counted", Ok(FactValue::Integer(1)));
        let declarations = vec![
            FactDeclaration::new(Fact::new("test.a", crate::probe::FactKind::Integer)).source(source),
            integer("test.a", 2),
        ];
        assert!(ProfileBuilder::new().build(&declarations).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_facts_bounded_by_slowest_timeout() {
        use crate::probe::CommandSource;

        let declarations: Vec<FactDeclaration> = (0..4)
            .map(|i| {
                FactDeclaration::new(Fact::text(format!("test.hung{}", i))).source(
                    CommandSource::new("sleep", &["5"], |s| Some(FactValue::from(s)))
                        .with_timeout(Duration::from_millis(500)),
                )
            })
            .chain(std::iter::once(integer("test.quick", 7)))
            .collect();

        let start = Instant::now();
        let profile = ProfileBuilder::new().with_max_parallelism(8).build(&declarations).unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);
        for i in 0..4 {
            let entry = profile.get(&format!("test.hung{}", i)).unwrap();
            assert_eq!(entry.reason(), Some(UnavailableReason::Timeout));
        }
        assert_eq!(profile.u64("test.quick"), Some(7));
    }

    #[test]
    fn test_progress_counts_every_fact() {
        let progress = Arc::new(ProgressReporter::disabled());
        let declarations = vec![integer("test.a", 1), integer("test.b", 2)];

        ProfileBuilder::new()
            .with_progress(Arc::clone(&progress))
            .build(&declarations)
            .unwrap();

        let summary = progress.summary();
        assert_eq!(summary.facts_total, 2);
        assert_eq!(summary.facts_resolved, 2);
    }
}
