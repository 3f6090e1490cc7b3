//! Configuration settings for HostProbe
//!
//! Defines CLI arguments, runtime configuration for fact resolution and
//! benchmark sizes, and their defaults.

use crate::environment::EnvVars;
use crate::probe::{DEFAULT_NETWORK_TIMEOUT, DEFAULT_SUBPROCESS_TIMEOUT};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default cap on concurrent fact resolutions
pub const DEFAULT_MAX_PARALLELISM: usize = 8;

/// Tools whose versions are reported by default
pub const DEFAULT_TOOLS: &[&str] = &["git", "docker", "python3", "node", "gcc", "rustc", "cargo", "go"];

/// Endpoints queried for the public IP address, in order
pub const DEFAULT_PUBLIC_IP_ENDPOINTS: &[&str] = &["https://api.ipify.org", "https://ifconfig.me/ip"];

/// HostProbe - host capability probe and CPU benchmark for CI runners
#[derive(Parser, Debug, Clone)]
#[command(name = "hostprobe")]
#[command(author = "HostProbe Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe host capabilities and benchmark CPU throughput")]
#[command(long_about = r#"
HostProbe reports what a machine (typically a CI runner) looks like and
how fast its cores are.

Every fact is resolved through ordered fallbacks (sysfs/procfs files,
system APIs, external tools). Facts that cannot be read are reported as
unavailable with a reason instead of failing the run.

Examples:
  hostprobe                           # Profile + benchmarks, text report
  hostprobe profile --show-sources    # Facts only, with the source used
  hostprobe bench --quick             # Short benchmark battery
  hostprobe --format json > host.json # Machine-readable report
"#)]
pub struct CliArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text", env = "HOSTPROBE_FORMAT")]
    pub format: OutputFormat,

    /// Fact groups to resolve (comma separated, default: all)
    #[arg(long, value_enum, value_delimiter = ',', value_name = "GROUP")]
    pub groups: Vec<FactGroup>,

    /// Tool whose version to report (repeatable, replaces the default list)
    #[arg(long = "tool", value_name = "NAME")]
    pub tools: Vec<String>,

    /// Do not resolve facts that need the network (public IP)
    #[arg(long, env = "HOSTPROBE_SKIP_NETWORK")]
    pub skip_network: bool,

    /// Deadline for local subprocess probes (e.g. 1s, 500ms)
    #[arg(long, default_value = "1s", value_name = "DURATION", env = "HOSTPROBE_SUBPROCESS_TIMEOUT")]
    pub subprocess_timeout: String,

    /// Deadline for network probes
    #[arg(long, default_value = "2s", value_name = "DURATION", env = "HOSTPROBE_NETWORK_TIMEOUT")]
    pub network_timeout: String,

    /// Maximum facts resolved concurrently
    #[arg(long, default_value_t = DEFAULT_MAX_PARALLELISM, value_name = "NUM")]
    pub max_parallelism: usize,

    /// Run smaller benchmark workloads
    #[arg(long)]
    pub quick: bool,

    /// Show which source produced each fact
    #[arg(long)]
    pub show_sources: bool,

    /// Root of the host filesystem (for /proc, /sys, /etc)
    #[arg(long, default_value = "/", value_name = "PATH", env = "HOSTPROBE_ROOT")]
    pub root: PathBuf,

    /// Verbose logging (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (no progress display)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Resolve host facts only
    #[command(name = "profile")]
    Profile,

    /// Run the benchmark battery only
    #[command(name = "bench")]
    Bench,

    /// Resolve facts and run benchmarks (default)
    #[command(name = "all")]
    All,
}

impl Commands {
    /// Whether host facts are resolved
    pub fn includes_profile(&self) -> bool {
        matches!(self, Commands::Profile | Commands::All)
    }

    /// Whether benchmarks run
    pub fn includes_benchmarks(&self) -> bool {
        matches!(self, Commands::Bench | Commands::All)
    }
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Log line format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Group of related facts
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactGroup {
    /// Operating system, kernel, architecture, hostname
    Os,
    /// CPU model, cores, frequencies
    Cpu,
    /// Physical memory
    Memory,
    /// Root filesystem usage
    Disk,
    /// Interfaces and public address
    Network,
    /// Installed tool versions
    Tools,
    /// CI provider and container runtime
    Environment,
}

impl FactGroup {
    /// Every group, in report order
    pub const ALL: [FactGroup; 7] = [
        FactGroup::Os,
        FactGroup::Cpu,
        FactGroup::Memory,
        FactGroup::Disk,
        FactGroup::Network,
        FactGroup::Tools,
        FactGroup::Environment,
    ];

    /// Section title used in reports
    pub fn title(&self) -> &'static str {
        match self {
            FactGroup::Os => "SYSTEM",
            FactGroup::Cpu => "CPU",
            FactGroup::Memory => "MEMORY",
            FactGroup::Disk => "DISK",
            FactGroup::Network => "NETWORK",
            FactGroup::Tools => "TOOLS",
            FactGroup::Environment => "ENVIRONMENT",
        }
    }

    /// Fact id prefix belonging to this group
    pub fn prefix(&self) -> &'static str {
        match self {
            FactGroup::Os => "os.",
            FactGroup::Cpu => "cpu.",
            FactGroup::Memory => "mem.",
            FactGroup::Disk => "disk.",
            FactGroup::Network => "net.",
            FactGroup::Tools => "tool.",
            FactGroup::Environment => "env.",
        }
    }
}

/// Location of the host filesystem trees probed by file sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPaths {
    root: PathBuf,
}

impl HostPaths {
    /// Paths under a custom root (a fake tree in tests)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The running system
    pub fn system() -> Self {
        Self::new("/")
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a host-absolute path such as `proc/meminfo`
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }
}

impl Default for HostPaths {
    fn default() -> Self {
        Self::system()
    }
}

/// Runtime configuration for fact resolution
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Host filesystem root
    pub paths: HostPaths,
    /// Directories searched for external tools (`None` = `PATH`)
    pub search_path: Option<Vec<PathBuf>>,
    /// Environment variable snapshot
    pub env: EnvVars,
    /// Deadline for local subprocesses
    pub subprocess_timeout: Duration,
    /// Deadline for network probes
    pub network_timeout: Duration,
    /// Maximum concurrent fact resolutions
    pub max_parallelism: usize,
    /// Fact groups to declare
    pub groups: Vec<FactGroup>,
    /// Tools whose versions are reported
    pub tools: Vec<String>,
    /// Public IP echo endpoints
    pub public_ip_endpoints: Vec<String>,
    /// Leave network facts without sources
    pub skip_network: bool,
    /// Use in-process system APIs (sysinfo, procfs, num_cpus) as tiers
    pub host_apis: bool,
    /// Path whose filesystem usage is reported
    pub disk_path: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            paths: HostPaths::system(),
            search_path: None,
            env: EnvVars::from_process(),
            subprocess_timeout: DEFAULT_SUBPROCESS_TIMEOUT,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            groups: FactGroup::ALL.to_vec(),
            tools: DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect(),
            public_ip_endpoints: DEFAULT_PUBLIC_IP_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            skip_network: false,
            host_apis: true,
            disk_path: PathBuf::from("/"),
        }
    }
}

impl ProbeConfig {
    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        let mut config = Self::default();

        config.paths = HostPaths::new(&args.root);
        // In-process APIs always describe the live host
        config.host_apis = args.root == Path::new("/");
        config.subprocess_timeout = humantime::parse_duration(&args.subprocess_timeout)
            .map_err(|e| format!("Invalid subprocess timeout '{}': {}", args.subprocess_timeout, e))?;
        config.network_timeout = humantime::parse_duration(&args.network_timeout)
            .map_err(|e| format!("Invalid network timeout '{}': {}", args.network_timeout, e))?;

        if config.subprocess_timeout.is_zero() || config.network_timeout.is_zero() {
            return Err("Timeouts must be greater than zero".to_string());
        }
        if args.max_parallelism == 0 {
            return Err("Max parallelism must be at least 1".to_string());
        }
        config.max_parallelism = args.max_parallelism;

        if !args.groups.is_empty() {
            config.groups = FactGroup::ALL
                .iter()
                .copied()
                .filter(|g| args.groups.contains(g))
                .collect();
        }
        if !args.tools.is_empty() {
            config.tools = args.tools.clone();
        }
        config.skip_network = args.skip_network;

        Ok(config)
    }

    /// Whether a group is selected
    pub fn includes(&self, group: FactGroup) -> bool {
        self.groups.contains(&group)
    }
}

/// Sizes of the benchmark workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Additions performed by the arithmetic case
    pub arithmetic_iterations: u64,
    /// Argument of the recursive Fibonacci case
    pub fibonacci_n: u32,
    /// Upper bound (exclusive) of the prime sieve
    pub prime_limit: usize,
    /// Elements sorted by the sort case
    pub sort_size: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            arithmetic_iterations: 100_000_000,
            fibonacci_n: 35,
            prime_limit: 100_000,
            sort_size: 5_000_000,
        }
    }
}

impl BenchmarkConfig {
    /// Small workloads for smoke runs and tests
    pub fn quick() -> Self {
        Self {
            arithmetic_iterations: 1_000_000,
            fibonacci_n: 20,
            prime_limit: 10_000,
            sort_size: 50_000,
        }
    }

    /// Pick the configuration matching the `--quick` flag
    pub fn from_cli(args: &CliArgs) -> Self {
        if args.quick {
            Self::quick()
        } else {
            Self::default()
        }
    }
}
