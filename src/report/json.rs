//! JSON export

use super::Report;
use crate::error::{ProbeError, Result};
use std::io::Write;

/// Write a report as pretty-printed JSON followed by a newline
pub fn render_json<W: Write>(report: &Report, mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out).map_err(|e| ProbeError::io("writing JSON report", e))?;
    out.flush().map_err(|e| ProbeError::io("flushing JSON report", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{BenchmarkCase, BenchmarkRunner, ThroughputUnit};
    use crate::probe::{Fact, FactValue, FnSource, UnavailableReason, Unit};
    use crate::profile::{ids, FactDeclaration, ProfileBuilder};

    fn report() -> Report {
        let declarations = vec![
            FactDeclaration::new(Fact::integer(ids::CPU_LOGICAL_CORES, Unit::Count))
                .source(FnSource::new("num_cpus:get", || Ok(FactValue::Integer(4)))),
            FactDeclaration::new(Fact::float(ids::CPU_AVG_FREQ_MHZ, Unit::Megahertz))
                .source(FnSource::new("/proc/cpuinfo", || Ok(FactValue::Float(2500.0)))),
            FactDeclaration::new(Fact::text(ids::NET_PUBLIC_IP)),
        ];
        let profile = ProfileBuilder::new().build(&declarations).unwrap();
        let cases = vec![BenchmarkCase::new("arithmetic", ThroughputUnit::OpsPerSec, 100, || Ok(4950))];
        Report::new(Some(profile), BenchmarkRunner::new().run(&cases))
    }

    #[test]
    fn test_json_document_shape() {
        let mut buf = Vec::new();
        render_json(&report(), &mut buf).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert!(doc["timestamp"].is_string());
        assert_eq!(doc["version"], crate::VERSION);
        assert_eq!(doc["profile"][ids::CPU_LOGICAL_CORES]["value"], 4);
        assert_eq!(doc["profile"][ids::CPU_LOGICAL_CORES]["source"], "num_cpus:get");
        assert_eq!(doc["profile"][ids::NET_PUBLIC_IP]["status"], "unavailable");
        assert_eq!(doc["profile"][ids::NET_PUBLIC_IP]["reason"], UnavailableReason::NotSupported.name());
        assert_eq!(doc["benchmarks"][0]["name"], "arithmetic");
        assert_eq!(doc["core_power"]["cores"], 4);
        assert_eq!(doc["runner_class"], "standard");
        assert!(buf.ends_with(b"\n"));
    }

    #[test]
    fn test_bench_only_report() {
        let report = Report::new(None, Vec::new());
        let mut buf = Vec::new();
        render_json(&report, &mut buf).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert!(doc["profile"].is_null());
        assert!(doc["core_power"].is_null());
        assert_eq!(doc["benchmarks"].as_array().map(Vec::len), Some(0));
    }
}
