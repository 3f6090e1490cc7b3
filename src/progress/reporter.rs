//! Progress reporter implementation
//!
//! Uses indicatif for terminal feedback on stderr:
//! - Fact resolution progress, one tick per resolved fact
//! - Benchmark progress, with the running case on the status line
//!
//! Rendering is hidden when stderr is not a terminal or in quiet mode, but
//! the counters still advance so summaries stay accurate.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress reporter for a probe run
pub struct ProgressReporter {
    /// Multi-progress container
    multi: MultiProgress,
    /// Fact resolution bar
    facts_bar: ProgressBar,
    /// Benchmark case bar
    cases_bar: ProgressBar,
    /// Current status message
    status: ProgressBar,
    /// Start time
    start_time: Instant,
    /// Facts declared
    facts_total: AtomicU64,
    /// Facts finished (resolved or not)
    facts_done: AtomicU64,
    /// Facts that resolved to a value
    facts_resolved: AtomicU64,
    /// Benchmark cases scheduled
    cases_total: AtomicU64,
    /// Benchmark cases finished
    cases_done: AtomicU64,
    /// Benchmark cases that failed
    cases_failed: AtomicU64,
    /// Is progress enabled
    enabled: AtomicBool,
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

impl ProgressReporter {
    /// Create a new progress reporter drawing to stderr
    pub fn new() -> Self {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());

        let status = multi.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let facts_bar = multi.add(ProgressBar::new(0));
        facts_bar.set_style(bar_style("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} facts"));
        facts_bar.set_prefix("Facts");

        let cases_bar = multi.add(ProgressBar::new(0));
        cases_bar.set_style(bar_style("{prefix:.bold.dim} [{bar:40.green/white}] {pos}/{len} cases ({elapsed})"));
        cases_bar.set_prefix("Bench");

        Self {
            multi,
            facts_bar,
            cases_bar,
            status,
            start_time: Instant::now(),
            facts_total: AtomicU64::new(0),
            facts_done: AtomicU64::new(0),
            facts_resolved: AtomicU64::new(0),
            cases_total: AtomicU64::new(0),
            cases_done: AtomicU64::new(0),
            cases_failed: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a disabled progress reporter (for quiet mode)
    pub fn disabled() -> Self {
        let reporter = Self::new();
        reporter.enabled.store(false, Ordering::SeqCst);
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Enabled only when stderr is an interactive terminal and not quiet
    pub fn for_terminal(quiet: bool) -> Self {
        if quiet || !console::Term::stderr().is_term() {
            Self::disabled()
        } else {
            Self::new()
        }
    }

    /// Begin fact resolution
    pub fn start_facts(&self, total: u64) {
        self.facts_total.store(total, Ordering::Relaxed);
        self.facts_bar.set_length(total);
        self.set_status("Resolving host facts");
    }

    /// Record one finished fact
    pub fn fact_finished(&self, id: &str, resolved: bool) {
        self.facts_done.fetch_add(1, Ordering::Relaxed);
        if resolved {
            self.facts_resolved.fetch_add(1, Ordering::Relaxed);
        }
        self.facts_bar.inc(1);
        self.status.set_message(format!("Resolved {}", id));
    }

    /// Begin the benchmark battery
    pub fn start_benchmarks(&self, total: u64) {
        self.cases_total.store(total, Ordering::Relaxed);
        self.cases_bar.set_length(total);
        self.set_status("Running benchmarks");
    }

    /// A benchmark case is about to run
    pub fn case_started(&self, name: &str) {
        self.status.set_message(format!("Benchmark: {}", name));
    }

    /// Record one finished benchmark case
    pub fn case_finished(&self, _name: &str, completed: bool) {
        self.cases_done.fetch_add(1, Ordering::Relaxed);
        if !completed {
            self.cases_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.cases_bar.inc(1);
    }

    /// Set current status message
    pub fn set_status(&self, msg: &str) {
        self.status.set_message(msg.to_string());
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Finish progress with error message
    pub fn finish_error(&self, message: &str) {
        self.status.finish_with_message(format!("✗ {}", message));
        self.facts_bar.abandon();
        self.cases_bar.abandon();
    }

    /// Remove all bars from the terminal
    pub fn clear(&self) {
        let _ = self.multi.clear();
    }

    /// Check if progress is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Get progress summary
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            facts_total: self.facts_total.load(Ordering::Relaxed),
            facts_done: self.facts_done.load(Ordering::Relaxed),
            facts_resolved: self.facts_resolved.load(Ordering::Relaxed),
            cases_total: self.cases_total.load(Ordering::Relaxed),
            cases_done: self.cases_done.load(Ordering::Relaxed),
            cases_failed: self.cases_failed.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress summary
#[derive(Debug, Clone)]
pub struct ProgressSummary {
    /// Facts declared
    pub facts_total: u64,
    /// Facts finished
    pub facts_done: u64,
    /// Facts that resolved
    pub facts_resolved: u64,
    /// Benchmark cases scheduled
    pub cases_total: u64,
    /// Benchmark cases finished
    pub cases_done: u64,
    /// Benchmark cases that failed
    pub cases_failed: u64,
    /// Elapsed time
    pub elapsed: Duration,
}

impl ProgressSummary {
    /// Share of finished facts that resolved, in percent
    pub fn resolved_percentage(&self) -> f64 {
        if self.facts_done == 0 {
            0.0
        } else {
            (self.facts_resolved as f64 / self.facts_done as f64) * 100.0
        }
    }

    /// One-line description for the final status
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.facts_total > 0 {
            parts.push(format!("{}/{} facts resolved", self.facts_resolved, self.facts_total));
        }
        if self.cases_total > 0 {
            parts.push(format!(
                "{}/{} benchmarks completed",
                self.cases_done - self.cases_failed,
                self.cases_total
            ));
        }
        parts.push(format!("in {}", humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64))));
        parts.join(", ")
    }
}
