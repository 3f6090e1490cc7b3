//! Plain text report

use super::Report;
use crate::bench::{BenchmarkOutcome, BenchmarkResult, ThroughputUnit, HEADLINE_CASE};
use crate::config::FactGroup;
use crate::error::{ProbeError, Result};
use crate::probe::{FactValue, ResolutionResult, Unit};
use std::io::{self, Write};
use std::time::Duration;

const ID_WIDTH: usize = 28;

/// Renders a [`Report`] as sectioned text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer {
    show_sources: bool,
}

impl TextRenderer {
    /// Create a renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `(via <source>)` to every resolved fact
    pub fn with_sources(mut self, show_sources: bool) -> Self {
        self.show_sources = show_sources;
        self
    }

    /// Write the report
    pub fn render<W: Write>(&self, report: &Report, mut out: W) -> Result<()> {
        self.write_report(report, &mut out)
            .and_then(|_| out.flush())
            .map_err(|e| ProbeError::io("writing text report", e))
    }

    fn write_report<W: Write>(&self, report: &Report, out: &mut W) -> io::Result<()> {
        writeln!(out, "hostprobe {} - {}", report.version, report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;

        if let Some(profile) = &report.profile {
            for group in FactGroup::ALL {
                let entries: Vec<&ResolutionResult> = profile.with_prefix(group.prefix()).collect();
                if entries.is_empty() {
                    continue;
                }
                section(out, group.title())?;
                for entry in entries {
                    self.write_fact(out, entry)?;
                }
            }
        }

        if !report.benchmarks.is_empty() {
            section(out, "BENCHMARKS")?;
            for result in &report.benchmarks {
                write_benchmark(out, result)?;
            }
        }

        if let Some(estimate) = &report.core_power {
            section(out, "CORE POWER")?;
            writeln!(out, "  Formula: cores x clock x IPC")?;
            writeln!(
                out,
                "  Cores: {}, clock: {:.2} MHz (from {})",
                estimate.cores, estimate.clock_mhz, estimate.clock_fact
            )?;
            for peak in &estimate.peak {
                writeln!(out, "  IPC={}: {:.1} GFLOPS", peak.ipc, peak.gflops)?;
            }
            writeln!(out, "  Per core (IPC=1): {:.2} GFLOPS", estimate.per_core_gflops)?;
        } else if report.profile.is_some() {
            section(out, "CORE POWER")?;
            writeln!(out, "  Unavailable: core count or clock speed unknown")?;
        }

        if report.profile.is_some() || !report.benchmarks.is_empty() {
            section(out, "RATING")?;
            if !report.benchmarks.is_empty() {
                match report.rating {
                    Some(tier) => writeln!(out, "  Overall: {} ({})", tier, tier.description())?,
                    None => writeln!(out, "  Overall: Unavailable ({} case did not complete)", HEADLINE_CASE)?,
                }
            }
            if let Some(class) = report.runner_class {
                writeln!(out, "  Runner class: {}", class)?;
            }
            if let Some(env) = &report.environment {
                if let Some(provider) = env.ci_provider {
                    writeln!(out, "  CI: {}", provider.display_name())?;
                }
            }
        }

        if let Some(profile) = &report.profile {
            writeln!(out)?;
            writeln!(
                out,
                "{}/{} facts resolved in {}",
                profile.resolved_count(),
                profile.len(),
                humantime::format_duration(round_millis(profile.build_time()))
            )?;
        }
        Ok(())
    }

    fn write_fact<W: Write>(&self, out: &mut W, entry: &ResolutionResult) -> io::Result<()> {
        match (entry.value(), entry.reason()) {
            (Some(value), _) => {
                let rendered = format_value(value, entry.fact.unit);
                match entry.source_used().filter(|_| self.show_sources) {
                    Some(source) => writeln!(out, "  {:<width$} {}  (via {})", entry.id(), rendered, source, width = ID_WIDTH),
                    None => writeln!(out, "  {:<width$} {}", entry.id(), rendered, width = ID_WIDTH),
                }
            }
            (None, Some(reason)) => writeln!(out, "  {:<width$} Unavailable: {}", entry.id(), reason, width = ID_WIDTH),
            (None, None) => Ok(()),
        }
    }
}

fn section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "=== {} ===", title)
}

fn write_benchmark<W: Write>(out: &mut W, result: &BenchmarkResult) -> io::Result<()> {
    match &result.outcome {
        BenchmarkOutcome::Completed { duration, throughput, tier, .. } => {
            let ms = duration.as_secs_f64() * 1000.0;
            match (result.unit, throughput) {
                (ThroughputUnit::Milliseconds, _) | (_, None) => {
                    writeln!(out, "  {:<12} {:>10.2} ms  {:>22}  {}", result.name, ms, "", tier)
                }
                (unit, Some(rate)) => {
                    let rate = format!("{:.0} {}", rate, unit.label());
                    writeln!(out, "  {:<12} {:>10.2} ms  {:>22}  {}", result.name, ms, rate, tier)
                }
            }
        }
        BenchmarkOutcome::Failed { reason, .. } => writeln!(out, "  {:<12} failed: {}", result.name, reason),
    }
}

/// Human form of a value in its unit
pub fn format_value(value: &FactValue, unit: Option<Unit>) -> String {
    match (value, unit) {
        (FactValue::Integer(bytes), Some(Unit::Bytes)) => humansize::format_size(*bytes, humansize::BINARY),
        (FactValue::Integer(v), Some(Unit::Megahertz)) => format!("{} {}", v, Unit::Megahertz.suffix()),
        (FactValue::Float(v), Some(Unit::Megahertz)) => format!("{:.2} {}", v, Unit::Megahertz.suffix()),
        (value, _) => value.to_string(),
    }
}

fn round_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
