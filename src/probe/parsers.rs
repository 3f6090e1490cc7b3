//! Typed parsers for host text formats
//!
//! One parser per format. Each returns a typed value, or `None` when the
//! text does not have the expected shape; sources turn `None` into
//! [`UnavailableReason::MalformedOutput`](super::UnavailableReason).

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// `PRETTY_NAME` from `/etc/os-release`, falling back to `NAME`
pub fn os_release_pretty_name(content: &str) -> Option<String> {
    let field = |key: &str| {
        content.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k.trim() == key).then(|| v.trim().trim_matches('"').trim_matches('\'').to_string())
        })
    };

    field("PRETTY_NAME")
        .filter(|v| !v.is_empty())
        .or_else(|| field("NAME").filter(|v| !v.is_empty()))
}

/// First non-empty line, trimmed
pub fn first_line(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// A `/proc/meminfo` field converted to bytes (`MemTotal:  16318412 kB`)
pub fn meminfo_bytes(content: &str, key: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let (k, rest) = line.split_once(':')?;
        if k.trim() != key {
            return None;
        }
        let mut parts = rest.split_whitespace();
        let value: u64 = parts.next()?.parse().ok()?;
        match parts.next() {
            Some("kB") => value.checked_mul(1024),
            None => Some(value),
            Some(_) => None,
        }
    })
}

/// CPU model from `/proc/cpuinfo` (`model name` on x86, `Model`/`Hardware` on ARM)
pub fn cpuinfo_model(content: &str) -> Option<String> {
    ["model name", "Model", "Hardware", "cpu model"]
        .iter()
        .find_map(|key| colon_field(content, key))
        .filter(|v| !v.is_empty())
}

/// Every `cpu MHz` entry in `/proc/cpuinfo`
pub fn cpuinfo_mhz_values(content: &str) -> Vec<f64> {
    content
        .lines()
        .filter_map(|line| {
            let (k, v) = line.split_once(':')?;
            if k.trim() == "cpu MHz" {
                v.trim().parse::<f64>().ok()
            } else {
                None
            }
        })
        .collect()
}

/// Mean of a set of values, `None` when empty
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Parse a kernel CPU list such as `0-3,8,10-11`
pub fn parse_cpu_list(content: &str) -> Option<Vec<usize>> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }

    let mut cpus = Vec::new();
    for part in content.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let (s, e) = (start.parse::<usize>().ok()?, end.parse::<usize>().ok()?);
            if e < s {
                return None;
            }
            cpus.extend(s..=e);
        } else {
            cpus.push(part.parse::<usize>().ok()?);
        }
    }
    Some(cpus)
}

/// sysfs `cpuinfo_max_freq` (kHz) converted to MHz
pub fn khz_to_mhz(content: &str) -> Option<u64> {
    let khz: u64 = content.trim().parse().ok()?;
    (khz > 0).then_some(khz / 1000)
}

/// Value of a `Key: value` line, matching the key exactly
pub fn colon_field(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim().to_string())
    })
}

/// Integer field of `lscpu` output
pub fn lscpu_integer(content: &str, key: &str) -> Option<u64> {
    colon_field(content, key)?.parse().ok()
}

/// `CPU max MHz` from `lscpu`, rounded to whole MHz
pub fn lscpu_max_mhz(content: &str) -> Option<u64> {
    let mhz: f64 = colon_field(content, "CPU max MHz")?.replace(',', ".").parse().ok()?;
    (mhz > 0.0).then(|| mhz.round() as u64)
}

/// Physical cores from `lscpu`: cores per socket times sockets
pub fn lscpu_physical_cores(content: &str) -> Option<u64> {
    let per_socket = lscpu_integer(content, "Core(s) per socket")
        .or_else(|| lscpu_integer(content, "Core(s) per cluster"))?;
    let sockets = lscpu_integer(content, "Socket(s)")
        .or_else(|| lscpu_integer(content, "Cluster(s)"))
        .unwrap_or(1);
    Some(per_socket * sockets)
}

/// Number of `processor` entries in `/proc/cpuinfo`
pub fn cpuinfo_processor_count(content: &str) -> Option<u64> {
    let count = content
        .lines()
        .filter(|line| line.split_once(':').is_some_and(|(k, _)| k.trim() == "processor"))
        .count();
    (count > 0).then_some(count as u64)
}

/// Distinct `(physical id, core id)` pairs in `/proc/cpuinfo`
///
/// `None` when the kernel does not report core ids (most ARM hosts).
pub fn cpuinfo_physical_cores(content: &str) -> Option<u64> {
    let mut cores = std::collections::BTreeSet::new();
    for block in content.split("\n\n") {
        let core = colon_field(block, "core id");
        let package = colon_field(block, "physical id").unwrap_or_default();
        if let Some(core) = core {
            cores.insert((package, core));
        }
    }
    (!cores.is_empty()).then_some(cores.len() as u64)
}

/// A column of the `Mem:` row of `free -b`
pub fn free_mem_column(content: &str, column: &str) -> Option<u64> {
    let mut lines = content.lines();
    let header: Vec<&str> = lines.next()?.split_whitespace().collect();
    let index = header.iter().position(|h| *h == column)?;

    let row = lines.find(|line| line.trim_start().starts_with("Mem:"))?;
    // The row has a leading `Mem:` label the header lacks
    row.split_whitespace().nth(index + 1)?.parse().ok()
}

/// Filesystem usage in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    /// Size of the filesystem
    pub total_bytes: u64,
    /// Bytes in use
    pub used_bytes: u64,
    /// Bytes available to unprivileged users
    pub available_bytes: u64,
}

/// Usage from POSIX `df -Pk <path>` output (1024-byte blocks)
pub fn df_usage(content: &str) -> Option<DiskUsage> {
    let row = content.lines().skip(1).find(|line| !line.trim().is_empty())?;
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.len() < 6 {
        return None;
    }

    let total: u64 = fields[1].parse().ok()?;
    let used: u64 = fields[2].parse().ok()?;
    let available: u64 = fields[3].parse().ok()?;

    Some(DiskUsage {
        total_bytes: total.checked_mul(1024)?,
        used_bytes: used.checked_mul(1024)?,
        available_bytes: available.checked_mul(1024)?,
    })
}

/// Interface addresses from `ip -o addr show`, as `name family address`
pub fn ip_addr_entries(content: &str) -> Option<Vec<String>> {
    let entries: Vec<String> = content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _index = fields.next()?;
            let name = fields.next()?.trim_end_matches(':');
            let family = fields.next()?;
            let address = fields.next()?;
            matches!(family, "inet" | "inet6").then(|| format!("{} {} {}", name, family, address))
        })
        .collect();

    (!entries.is_empty()).then_some(entries)
}

/// A single IP address, as returned by public-IP echo services
pub fn ip_address(content: &str) -> Option<String> {
    let candidate = content.trim();
    candidate.parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// Version number from a `--version` banner
///
/// Prefers the first token that is purely dotted digits (after stripping
/// punctuation and a leading alphabetic prefix such as `v` or `go`), so
/// `gcc (Ubuntu 13.2.0-23ubuntu4) 13.2.0` yields `13.2.0`.
pub fn version_token(content: &str) -> Option<String> {
    let line = first_line(content)?;

    let candidates: Vec<&str> = line
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| matches!(c, '(' | ')' | ',' | ';' | '"' | '\'')))
        .map(|token| token.trim_start_matches(|c: char| c.is_ascii_alphabetic()))
        .filter(|token| token.starts_with(|c: char| c.is_ascii_digit()))
        .collect();

    let is_dotted = |token: &str| {
        token.contains('.') && token.split('.').all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
    };

    candidates
        .iter()
        .copied()
        .find(|token| is_dotted(*token))
        .or_else(|| candidates.iter().copied().find(|token| token.contains('.')))
        .map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OS_RELEASE: &str = r#"NAME="Ubuntu"
VERSION_ID="24.04"
PRETTY_NAME="Ubuntu 24.04.1 LTS"
ID=ubuntu
"#;

    const MEMINFO: &str = "MemTotal:       16318412 kB\nMemFree:         1203932 kB\nMemAvailable:   10241440 kB\nHugePages_Total:       0\n";

    const CPUINFO: &str = "processor\t: 0\nmodel name\t: AMD EPYC 7763 64-Core Processor\ncpu MHz\t\t: 2445.404\n\nprocessor\t: 1\nmodel name\t: AMD EPYC 7763 64-Core Processor\ncpu MHz\t\t: 3243.520\n";

    const LSCPU: &str = "Architecture:             x86_64\nCPU(s):                   4\nModel name:               AMD EPYC 7763 64-Core Processor\nThread(s) per core:       2\nCore(s) per socket:       2\nSocket(s):                1\nCPU max MHz:              3529.0520\n";

    #[test]
    fn test_os_release() {
        assert_eq!(os_release_pretty_name(OS_RELEASE).as_deref(), Some("Ubuntu 24.04.1 LTS"));
        assert_eq!(os_release_pretty_name("NAME=Alpine\n").as_deref(), Some("Alpine"));
        assert_eq!(os_release_pretty_name("ID=x\n"), None);
    }

    #[test]
    fn test_meminfo() {
        assert_eq!(meminfo_bytes(MEMINFO, "MemTotal"), Some(16318412 * 1024));
        assert_eq!(meminfo_bytes(MEMINFO, "MemAvailable"), Some(10241440 * 1024));
        assert_eq!(meminfo_bytes(MEMINFO, "HugePages_Total"), Some(0));
        assert_eq!(meminfo_bytes(MEMINFO, "SwapTotal"), None);
        assert_eq!(meminfo_bytes("MemTotal: lots kB", "MemTotal"), None);
    }

    #[test]
    fn test_cpuinfo() {
        assert_eq!(cpuinfo_model(CPUINFO).as_deref(), Some("AMD EPYC 7763 64-Core Processor"));
        let mhz = cpuinfo_mhz_values(CPUINFO);
        assert_eq!(mhz.len(), 2);
        let avg = average(&mhz).unwrap();
        assert!((avg - 2844.462).abs() < 0.001);
        assert_eq!(average(&[]), None);
    }

    #[test]
    fn test_cpuinfo_counts() {
        assert_eq!(cpuinfo_processor_count(CPUINFO), Some(2));
        assert_eq!(cpuinfo_processor_count("model name: x\n"), None);

        let smt = "processor\t: 0\nphysical id\t: 0\ncore id\t\t: 0\n\nprocessor\t: 1\nphysical id\t: 0\ncore id\t\t: 1\n\nprocessor\t: 2\nphysical id\t: 0\ncore id\t\t: 0\n\nprocessor\t: 3\nphysical id\t: 0\ncore id\t\t: 1\n";
        assert_eq!(cpuinfo_physical_cores(smt), Some(2));
        assert_eq!(cpuinfo_physical_cores(CPUINFO), None);
    }

    #[test]
    fn test_arm_cpuinfo_model() {
        let arm = "processor\t: 0\nBogoMIPS\t: 108.00\nModel\t\t: Raspberry Pi 4 Model B Rev 1.4\n";
        assert_eq!(cpuinfo_model(arm).as_deref(), Some("Raspberry Pi 4 Model B Rev 1.4"));
    }

    #[test]
    fn test_cpu_list() {
        assert_eq!(parse_cpu_list("0-3\n"), Some(vec![0, 1, 2, 3]));
        assert_eq!(parse_cpu_list("0,2,4-5"), Some(vec![0, 2, 4, 5]));
        assert_eq!(parse_cpu_list(""), None);
        assert_eq!(parse_cpu_list("3-1"), None);
        assert_eq!(parse_cpu_list("a-b"), None);
    }

    #[test]
    fn test_khz_to_mhz() {
        assert_eq!(khz_to_mhz("2800000\n"), Some(2800));
        assert_eq!(khz_to_mhz("0"), None);
        assert_eq!(khz_to_mhz("fast"), None);
    }

    #[test]
    fn test_lscpu() {
        assert_eq!(lscpu_max_mhz(LSCPU), Some(3529));
        assert_eq!(lscpu_physical_cores(LSCPU), Some(2));
        assert_eq!(lscpu_integer(LSCPU, "Thread(s) per core"), Some(2));
        assert_eq!(colon_field(LSCPU, "Model name").as_deref(), Some("AMD EPYC 7763 64-Core Processor"));
        assert_eq!(lscpu_max_mhz("Architecture: aarch64\n"), None);
    }

    #[test]
    fn test_free() {
        let free = "               total        used        free      shared  buff/cache   available\nMem:     16709853184  5393272832  1232809984    63123456 10459914240 10487078912\nSwap:     4294963200           0  4294963200\n";
        assert_eq!(free_mem_column(free, "total"), Some(16709853184));
        assert_eq!(free_mem_column(free, "available"), Some(10487078912));
        assert_eq!(free_mem_column(free, "missing"), None);
    }

    #[test]
    fn test_df() {
        let df = "Filesystem     1024-blocks     Used Available Capacity Mounted on\n/dev/root        76026616 52010152  24000080      69% /\n";
        let usage = df_usage(df).unwrap();
        assert_eq!(usage.total_bytes, 76026616 * 1024);
        assert_eq!(usage.used_bytes, 52010152 * 1024);
        assert_eq!(usage.available_bytes, 24000080 * 1024);
        assert_eq!(df_usage("Filesystem only header\n"), None);
    }

    #[test]
    fn test_ip_addr() {
        let ip = "1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever\n2: eth0    inet 10.1.0.4/16 brd 10.1.255.255 scope global eth0\\       valid_lft forever\n2: eth0    inet6 fe80::20d:3aff:fe12:3456/64 scope link \\       valid_lft forever\n";
        let entries = ip_addr_entries(ip).unwrap();
        assert_eq!(entries, vec![
            "lo inet 127.0.0.1/8".to_string(),
            "eth0 inet 10.1.0.4/16".to_string(),
            "eth0 inet6 fe80::20d:3aff:fe12:3456/64".to_string(),
        ]);
        assert_eq!(ip_addr_entries(""), None);
    }

    #[test]
    fn test_ip_address() {
        assert_eq!(ip_address("203.0.113.7\n").as_deref(), Some("203.0.113.7"));
        assert_eq!(ip_address("2001:db8::1").as_deref(), Some("2001:db8::1"));
        assert_eq!(ip_address("<html>rate limited</html>"), None);
    }

    #[test]
    fn test_version_token() {
        let cases = [
            ("git version 2.43.0\n", "2.43.0"),
            ("Docker version 24.0.7, build afdd53b", "24.0.7"),
            ("Python 3.12.3", "3.12.3"),
            ("v20.11.0", "20.11.0"),
            ("gcc (Ubuntu 13.2.0-23ubuntu4) 13.2.0\nCopyright (C) 2023", "13.2.0"),
            ("rustc 1.79.0 (129f3b996 2024-06-10)", "1.79.0"),
            ("go version go1.22.1 linux/amd64", "1.22.1"),
        ];
        for (banner, expected) in cases {
            assert_eq!(version_token(banner).as_deref(), Some(expected), "banner: {}", banner);
        }
        assert_eq!(version_token("no version here"), None);
    }
}
