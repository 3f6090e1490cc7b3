//! Default fact catalog
//!
//! Every fact lists its sources in priority order. Kernel files come first,
//! then in-process system APIs (sysinfo, procfs, num_cpus, hostname), then
//! external tools. Where a tool reports strictly more than the files do
//! (`ip -o addr` for interfaces) the tool goes first.

use super::FactDeclaration;
use crate::config::{FactGroup, ProbeConfig};
use crate::environment::EnvironmentDetector;
use crate::probe::parsers::{self, DiskUsage};
use crate::probe::{CommandChain, CommandSource, Fact, FactValue, FileSource, FnSource, SourceOutcome, UnavailableReason, Unit, ValueSource};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

/// Stable fact identifiers
pub mod ids {
    /// Distribution name and version
    pub const OS_NAME: &str = "os.name";
    /// Kernel release
    pub const OS_KERNEL: &str = "os.kernel";
    /// Machine architecture
    pub const OS_ARCH: &str = "os.arch";
    /// Host name
    pub const OS_HOSTNAME: &str = "os.hostname";

    /// CPU model string
    pub const CPU_MODEL: &str = "cpu.model";
    /// Online logical CPUs
    pub const CPU_LOGICAL_CORES: &str = "cpu.logical_cores";
    /// Physical cores
    pub const CPU_PHYSICAL_CORES: &str = "cpu.physical_cores";
    /// Hardware threads per core
    pub const CPU_THREADS_PER_CORE: &str = "cpu.threads_per_core";
    /// Mean current clock across cores
    pub const CPU_AVG_FREQ_MHZ: &str = "cpu.avg_freq_mhz";
    /// Current clock of each core, first eight
    pub const CPU_CORE_FREQS_MHZ: &str = "cpu.core_freqs_mhz";
    /// Maximum clock
    pub const CPU_MAX_FREQ_MHZ: &str = "cpu.max_freq_mhz";

    /// Installed memory
    pub const MEM_TOTAL_BYTES: &str = "mem.total_bytes";
    /// Memory available to new work
    pub const MEM_AVAILABLE_BYTES: &str = "mem.available_bytes";

    /// Size of the filesystem holding `/`
    pub const DISK_TOTAL_BYTES: &str = "disk.root.total_bytes";
    /// Used space on that filesystem
    pub const DISK_USED_BYTES: &str = "disk.root.used_bytes";
    /// Free space on that filesystem
    pub const DISK_AVAILABLE_BYTES: &str = "disk.root.available_bytes";

    /// Network interfaces
    pub const NET_INTERFACES: &str = "net.interfaces";
    /// Address seen by public echo services
    pub const NET_PUBLIC_IP: &str = "net.public_ip";

    /// Detected CI provider
    pub const ENV_CI_PROVIDER: &str = "env.ci_provider";
    /// Detected container runtime
    pub const ENV_CONTAINER: &str = "env.container";
}

/// Fact id for a tool's version (`tool.git.version`)
pub fn tool_fact_id(tool: &str) -> String {
    format!("tool.{}.version", tool)
}

/// The CI provider fact
pub fn env_ci_fact() -> Fact {
    Fact::text(ids::ENV_CI_PROVIDER)
}

/// The container runtime fact
pub fn env_container_fact() -> Fact {
    Fact::text(ids::ENV_CONTAINER)
}

/// System API state captured on first use and shared by the API tiers
struct SystemSnapshot {
    system: OnceLock<System>,
    disk: OnceLock<Option<DiskUsage>>,
    disk_path: PathBuf,
}

impl SystemSnapshot {
    fn new(disk_path: PathBuf) -> Self {
        Self {
            system: OnceLock::new(),
            disk: OnceLock::new(),
            disk_path,
        }
    }

    fn system(&self) -> &System {
        self.system.get_or_init(|| {
            System::new_with_specifics(
                RefreshKind::new()
                    .with_cpu(CpuRefreshKind::everything())
                    .with_memory(MemoryRefreshKind::everything()),
            )
        })
    }

    /// Usage of the filesystem with the longest mount point containing the path
    fn disk(&self) -> Option<DiskUsage> {
        *self.disk.get_or_init(|| {
            let disks = Disks::new_with_refreshed_list();
            disks
                .iter()
                .filter(|disk| self.disk_path.starts_with(disk.mount_point()))
                .max_by_key(|disk| disk.mount_point().as_os_str().len())
                .filter(|disk| disk.total_space() > 0)
                .map(|disk| DiskUsage {
                    total_bytes: disk.total_space(),
                    used_bytes: disk.total_space().saturating_sub(disk.available_space()),
                    available_bytes: disk.available_space(),
                })
        })
    }
}

/// Cores listed in `cpu.core_freqs_mhz`
const CORE_FREQ_LIMIT: usize = 8;

fn core_freqs(mhz: Vec<f64>) -> Option<FactValue> {
    let list: Vec<String> = mhz.iter().take(CORE_FREQ_LIMIT).map(|f| format!("{:.2}", f)).collect();
    (!list.is_empty()).then_some(FactValue::List(list))
}

/// Builds the default fact declarations for a configuration
pub struct FactCatalog {
    config: ProbeConfig,
    snapshot: Arc<SystemSnapshot>,
}

impl FactCatalog {
    /// Create a catalog for a configuration
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            config: config.clone(),
            snapshot: Arc::new(SystemSnapshot::new(config.disk_path.clone())),
        }
    }

    /// Declarations for every selected group, in group order
    pub fn declarations(&self) -> Vec<FactDeclaration> {
        FactGroup::ALL
            .into_iter()
            .filter(|&group| self.config.includes(group))
            .flat_map(|group| self.group(group))
            .collect()
    }

    /// Declarations for one group
    pub fn group(&self, group: FactGroup) -> Vec<FactDeclaration> {
        match group {
            FactGroup::Os => self.os_facts(),
            FactGroup::Cpu => self.cpu_facts(),
            FactGroup::Memory => self.memory_facts(),
            FactGroup::Disk => self.disk_facts(),
            FactGroup::Network => self.network_facts(),
            FactGroup::Tools => self.tool_facts(),
            FactGroup::Environment => self.environment_facts(),
        }
    }

    fn os_facts(&self) -> Vec<FactDeclaration> {
        vec![
            FactDeclaration::new(Fact::text(ids::OS_NAME))
                .source(self.file("etc/os-release", |s| parsers::os_release_pretty_name(s).map(FactValue::Text)))
                .source(self.file("usr/lib/os-release", |s| parsers::os_release_pretty_name(s).map(FactValue::Text)))
                .sources(self.api("sysinfo:long_os_version", |_| System::long_os_version().map(FactValue::Text)))
                .source(self.command("uname", &["-s"], text_line)),
            FactDeclaration::new(Fact::text(ids::OS_KERNEL))
                .source(self.file("proc/sys/kernel/osrelease", text_line))
                .sources(self.api("sysinfo:kernel_version", |_| System::kernel_version().map(FactValue::Text)))
                .source(self.command("uname", &["-r"], text_line)),
            FactDeclaration::new(Fact::text(ids::OS_ARCH))
                .source(self.file("proc/sys/kernel/arch", text_line))
                .source(self.command("uname", &["-m"], text_line))
                .sources(self.host_fn("build-target:arch", || Ok(FactValue::from(std::env::consts::ARCH)))),
            FactDeclaration::new(Fact::text(ids::OS_HOSTNAME))
                .source(self.file("proc/sys/kernel/hostname", text_line))
                .source(self.file("etc/hostname", text_line))
                .sources(self.host_fn("hostname:gethostname", || {
                    let name = hostname::get().map_err(|e| UnavailableReason::from_io(&e))?;
                    name.into_string()
                        .ok()
                        .filter(|n| !n.is_empty())
                        .map(FactValue::Text)
                        .ok_or(UnavailableReason::MalformedOutput)
                }))
                .source(self.command("hostname", &[], text_line)),
        ]
    }

    fn cpu_facts(&self) -> Vec<FactDeclaration> {
        let max_freq = self
            .max_frequency_candidates()
            .into_iter()
            .fold(FactDeclaration::new(Fact::integer(ids::CPU_MAX_FREQ_MHZ, Unit::Megahertz)), |decl, path| {
                decl.source(FileSource::new(path, |s| parsers::khz_to_mhz(s).map(FactValue::Integer)))
            })
            .source(self.command("lscpu", &[], |s| parsers::lscpu_max_mhz(s).map(FactValue::Integer)));

        vec![
            FactDeclaration::new(Fact::text(ids::CPU_MODEL))
                .source(self.file("proc/cpuinfo", |s| parsers::cpuinfo_model(s).map(FactValue::Text)))
                .source(self.command("lscpu", &[], |s| {
                    parsers::colon_field(s, "Model name").filter(|m| !m.is_empty()).map(FactValue::Text)
                }))
                .sources(self.api("sysinfo:cpu_brand", |sys| {
                    sys.cpus()
                        .first()
                        .map(|cpu| cpu.brand().trim().to_string())
                        .filter(|brand| !brand.is_empty())
                        .map(FactValue::Text)
                })),
            FactDeclaration::new(Fact::integer(ids::CPU_LOGICAL_CORES, Unit::Count))
                .source(self.file("sys/devices/system/cpu/online", cpu_list_len))
                .source(self.file("proc/cpuinfo", |s| parsers::cpuinfo_processor_count(s).map(FactValue::Integer)))
                .sources(self.host_fn("num_cpus:get", || Ok(FactValue::Integer(num_cpus::get() as u64))))
                .source(self.command("lscpu", &[], |s| parsers::lscpu_integer(s, "CPU(s)").map(FactValue::Integer)))
                .source(self.command("nproc", &[], |s| s.trim().parse().ok().map(FactValue::Integer))),
            FactDeclaration::new(Fact::integer(ids::CPU_PHYSICAL_CORES, Unit::Count))
                .source(self.file("proc/cpuinfo", |s| parsers::cpuinfo_physical_cores(s).map(FactValue::Integer)))
                .sources(self.host_fn("num_cpus:get_physical", || Ok(FactValue::Integer(num_cpus::get_physical() as u64))))
                .source(self.command("lscpu", &[], |s| parsers::lscpu_physical_cores(s).map(FactValue::Integer))),
            FactDeclaration::new(Fact::integer(ids::CPU_THREADS_PER_CORE, Unit::Count))
                .source(self.file("sys/devices/system/cpu/cpu0/topology/thread_siblings_list", cpu_list_len))
                .source(self.file("sys/devices/system/cpu/cpu0/topology/core_cpus_list", cpu_list_len))
                .source(self.command("lscpu", &[], |s| {
                    parsers::lscpu_integer(s, "Thread(s) per core").map(FactValue::Integer)
                })),
            FactDeclaration::new(Fact::float(ids::CPU_AVG_FREQ_MHZ, Unit::Megahertz))
                .source(self.file("proc/cpuinfo", |s| {
                    parsers::average(&parsers::cpuinfo_mhz_values(s)).map(FactValue::Float)
                }))
                .sources(self.api("sysinfo:cpu_frequency", |sys| {
                    let mhz: Vec<f64> = sys
                        .cpus()
                        .iter()
                        .map(|cpu| cpu.frequency() as f64)
                        .filter(|&f| f > 0.0)
                        .collect();
                    parsers::average(&mhz).map(FactValue::Float)
                }))
                .source(self.command("lscpu", &[], |s| {
                    parsers::colon_field(s, "CPU MHz")
                        .and_then(|v| v.replace(',', ".").parse::<f64>().ok())
                        .filter(|&mhz| mhz > 0.0)
                        .map(FactValue::Float)
                })),
            FactDeclaration::new(Fact::list(ids::CPU_CORE_FREQS_MHZ).with_unit(Unit::Megahertz))
                .source(self.file("proc/cpuinfo", |s| core_freqs(parsers::cpuinfo_mhz_values(s))))
                .sources(self.api("sysinfo:cpu_frequency", |sys| {
                    core_freqs(sys.cpus().iter().map(|cpu| cpu.frequency() as f64).filter(|&f| f > 0.0).collect())
                })),
            max_freq,
        ]
    }

    /// sysfs files that may hold the maximum core frequency, in probe order
    ///
    /// `policy0` and `cpu0/cpufreq` first, then every `policyN` found on
    /// disk in numeric order. Paths appear once.
    pub fn max_frequency_candidates(&self) -> Vec<PathBuf> {
        let cpu_dir = self.config.paths.path("sys/devices/system/cpu");
        let mut candidates = vec![
            cpu_dir.join("cpufreq/policy0/cpuinfo_max_freq"),
            cpu_dir.join("cpu0/cpufreq/cpuinfo_max_freq"),
        ];

        let mut policies: Vec<u32> = std::fs::read_dir(cpu_dir.join("cpufreq"))
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| entry.file_name().to_str()?.strip_prefix("policy")?.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        policies.sort_unstable();

        for policy in policies {
            let path = cpu_dir.join(format!("cpufreq/policy{}/cpuinfo_max_freq", policy));
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }
        candidates
    }

    fn memory_facts(&self) -> Vec<FactDeclaration> {
        vec![
            FactDeclaration::new(Fact::integer(ids::MEM_TOTAL_BYTES, Unit::Bytes))
                .source(self.file("proc/meminfo", |s| parsers::meminfo_bytes(s, "MemTotal").map(FactValue::Integer)))
                .sources(self.procfs_meminfo(MeminfoField::Total))
                .sources(self.api("sysinfo:total_memory", |sys| {
                    Some(sys.total_memory()).filter(|&b| b > 0).map(FactValue::Integer)
                }))
                .source(self.command("free", &["-b"], |s| parsers::free_mem_column(s, "total").map(FactValue::Integer))),
            FactDeclaration::new(Fact::integer(ids::MEM_AVAILABLE_BYTES, Unit::Bytes))
                .source(self.file("proc/meminfo", |s| {
                    parsers::meminfo_bytes(s, "MemAvailable").map(FactValue::Integer)
                }))
                .sources(self.procfs_meminfo(MeminfoField::Available))
                .sources(self.api("sysinfo:available_memory", |sys| {
                    Some(sys.available_memory()).filter(|&b| b > 0).map(FactValue::Integer)
                }))
                .source(self.command("free", &["-b"], |s| {
                    parsers::free_mem_column(s, "available").map(FactValue::Integer)
                })),
        ]
    }

    fn disk_facts(&self) -> Vec<FactDeclaration> {
        vec![
            self.disk_fact(ids::DISK_TOTAL_BYTES, |u| u.total_bytes),
            self.disk_fact(ids::DISK_USED_BYTES, |u| u.used_bytes),
            self.disk_fact(ids::DISK_AVAILABLE_BYTES, |u| u.available_bytes),
        ]
    }

    fn disk_fact(&self, id: &str, pick: fn(&DiskUsage) -> u64) -> FactDeclaration {
        let disk_path = self.config.disk_path.to_string_lossy().into_owned();

        let api = self.config.host_apis.then(|| {
            let snapshot = Arc::clone(&self.snapshot);
            Box::new(FnSource::optional("sysinfo:disks", move || {
                snapshot.disk().map(|usage| FactValue::Integer(pick(&usage)))
            })) as Box<dyn ValueSource>
        });

        FactDeclaration::new(Fact::integer(id, Unit::Bytes))
            .sources(api)
            .source(self.command("df", &["-Pk", disk_path.as_str()], move |s| {
                parsers::df_usage(s).map(|usage| FactValue::Integer(pick(&usage)))
            }))
    }

    fn network_facts(&self) -> Vec<FactDeclaration> {
        let sys_class_net = self.config.paths.path("sys/class/net");
        let interfaces = FactDeclaration::new(Fact::list(ids::NET_INTERFACES))
            .source(self.command("ip", &["-o", "addr", "show"], |s| parsers::ip_addr_entries(s).map(FactValue::List)))
            .source(FnSource::new(sys_class_net.display().to_string(), move || {
                let entries = std::fs::read_dir(&sys_class_net).map_err(|e| UnavailableReason::from_io(&e))?;
                let mut names: Vec<String> = entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| entry.file_name().into_string().ok())
                    .collect();
                names.sort();
                if names.is_empty() {
                    Err(UnavailableReason::NotSupported)
                } else {
                    Ok(FactValue::List(names))
                }
            }))
            .sources(self.host_fn("sysinfo:networks", || {
                let networks = Networks::new_with_refreshed_list();
                let mut names: Vec<String> = networks.iter().map(|(name, _)| name.clone()).collect();
                names.sort();
                if names.is_empty() {
                    Err(UnavailableReason::NotSupported)
                } else {
                    Ok(FactValue::List(names))
                }
            }));

        vec![interfaces, self.public_ip_fact()]
    }

    /// One source walking curl then wget over every endpoint
    ///
    /// The commands share `network_timeout`. Their own transfer limits sit
    /// one second above it, so the shared deadline always fires first.
    fn public_ip_fact(&self) -> FactDeclaration {
        let declaration = FactDeclaration::new(Fact::text(ids::NET_PUBLIC_IP));
        let endpoints = &self.config.public_ip_endpoints;
        if self.config.skip_network || endpoints.is_empty() {
            return declaration;
        }

        let limit = (self.config.network_timeout.as_secs() + 1).to_string();
        let label = format!("curl|wget {}", endpoints.join(" "));
        let chain = CommandChain::new(label, |s| parsers::ip_address(s).map(FactValue::Text))
            .with_timeout(self.config.network_timeout)
            .with_search_path(self.config.search_path.clone());
        let chain = endpoints
            .iter()
            .fold(chain, |chain, url| chain.command("curl", &["-fsS", "--max-time", limit.as_str(), url.as_str()]));
        let chain = endpoints
            .iter()
            .fold(chain, |chain, url| chain.command("wget", &["-qO-", "-T", limit.as_str(), url.as_str()]));

        declaration.source(chain)
    }

    fn tool_facts(&self) -> Vec<FactDeclaration> {
        self.config
            .tools
            .iter()
            .map(|tool| {
                let args: &[&str] = if tool == "go" { &["version"] } else { &["--version"] };
                FactDeclaration::new(Fact::text(tool_fact_id(tool)))
                    .source(self.command(tool, args, |s| parsers::version_token(s).map(FactValue::Text)))
            })
            .collect()
    }

    fn environment_facts(&self) -> Vec<FactDeclaration> {
        let detector = EnvironmentDetector::from_config(&self.config);
        vec![
            FactDeclaration::new(env_ci_fact()).sources(detector.ci_sources()),
            FactDeclaration::new(env_container_fact()).sources(detector.container_sources()),
        ]
    }

    fn file<F>(&self, relative: &str, parser: F) -> FileSource
    where
        F: Fn(&str) -> Option<FactValue> + Send + Sync + 'static,
    {
        FileSource::new(self.config.paths.path(relative), parser)
    }

    fn command<F>(&self, program: &str, args: &[&str], parser: F) -> CommandSource
    where
        F: Fn(&str) -> Option<FactValue> + Send + Sync + 'static,
    {
        CommandSource::new(program, args, parser)
            .with_timeout(self.config.subprocess_timeout)
            .with_search_path(self.config.search_path.clone())
    }

    /// A sysinfo tier, absent when system APIs are disabled
    fn api<F>(&self, label: &str, probe: F) -> Option<Box<dyn ValueSource>>
    where
        F: Fn(&System) -> Option<FactValue> + Send + Sync + 'static,
    {
        let snapshot = Arc::clone(&self.snapshot);
        self.host_fn_optional(label, move || probe(snapshot.system()))
    }

    /// An in-process tier, absent when system APIs are disabled
    fn host_fn<F>(&self, label: &str, probe: F) -> Option<Box<dyn ValueSource>>
    where
        F: Fn() -> SourceOutcome + Send + Sync + 'static,
    {
        self.config
            .host_apis
            .then(|| Box::new(FnSource::new(label, probe)) as Box<dyn ValueSource>)
    }

    fn host_fn_optional<F>(&self, label: &str, probe: F) -> Option<Box<dyn ValueSource>>
    where
        F: Fn() -> Option<FactValue> + Send + Sync + 'static,
    {
        self.config
            .host_apis
            .then(|| Box::new(FnSource::optional(label, probe)) as Box<dyn ValueSource>)
    }

    #[cfg(target_os = "linux")]
    fn procfs_meminfo(&self, field: MeminfoField) -> Option<Box<dyn ValueSource>> {
        // procfs always reads the live /proc
        if self.config.paths.root() != Path::new("/") {
            return None;
        }
        self.host_fn(field.label(), move || {
            use procfs::Current;
            let meminfo = procfs::Meminfo::current().map_err(|e| match e {
                procfs::ProcError::PermissionDenied(_) => UnavailableReason::PermissionDenied,
                _ => UnavailableReason::NotSupported,
            })?;
            let bytes = match field {
                MeminfoField::Total => Some(meminfo.mem_total),
                MeminfoField::Available => meminfo.mem_available,
            };
            bytes.map(FactValue::Integer).ok_or(UnavailableReason::NotSupported)
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn procfs_meminfo(&self, _field: MeminfoField) -> Option<Box<dyn ValueSource>> {
        None
    }
}

/// `/proc/meminfo` fields read through procfs
#[derive(Debug, Clone, Copy)]
enum MeminfoField {
    Total,
    Available,
}

impl MeminfoField {
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    fn label(&self) -> &'static str {
        match self {
            MeminfoField::Total => "procfs:meminfo.mem_total",
            MeminfoField::Available => "procfs:meminfo.mem_available",
        }
    }
}

fn text_line(content: &str) -> Option<FactValue> {
    parsers::first_line(content).map(FactValue::Text)
}

fn cpu_list_len(content: &str) -> Option<FactValue> {
    parsers::parse_cpu_list(content).map(|cpus| FactValue::Integer(cpus.len() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostPaths;
    use crate::environment::EnvVars;
    use crate::profile::{plan_waves, HostProfile, ProfileBuilder};
    use crate::probe::AttemptOutcome;
    use tempfile::TempDir;

    fn config(root: &TempDir) -> ProbeConfig {
        ProbeConfig {
            paths: HostPaths::new(root.path()),
            search_path: Some(Vec::new()),
            env: EnvVars::from_pairs(Vec::<(String, String)>::new()),
            host_apis: false,
            ..ProbeConfig::default()
        }
    }

    fn write(root: &TempDir, relative: &str, content: &str) {
        let path = root.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_default_declarations_are_valid() {
        let root = TempDir::new().unwrap();
        let catalog = FactCatalog::new(&config(&root));
        let declarations = catalog.declarations();

        assert!(plan_waves(&declarations).is_ok());
        let ids: Vec<&str> = declarations.iter().map(|d| d.id()).collect();
        assert_eq!(ids.first(), Some(&ids::OS_NAME));
        assert!(ids.contains(&ids::CPU_MAX_FREQ_MHZ));
        assert!(ids.contains(&"tool.git.version"));
        assert_eq!(ids.last(), Some(&ids::ENV_CONTAINER));
    }

    #[test]
    fn test_group_selection() {
        let root = TempDir::new().unwrap();
        let mut config = config(&root);
        config.groups = vec![FactGroup::Cpu];

        let declarations = FactCatalog::new(&config).declarations();
        assert_eq!(declarations.len(), 7);
        assert!(declarations.iter().all(|d| d.id().starts_with("cpu.")));
    }

    #[test]
    fn test_max_frequency_from_policy_file() {
        let root = TempDir::new().unwrap();
        write(&root, "sys/devices/system/cpu/cpufreq/policy0/cpuinfo_max_freq", "2800000\n");
        let mut config = config(&root);
        config.groups = vec![FactGroup::Cpu];

        let catalog = FactCatalog::new(&config);
        let profile = ProfileBuilder::new().build(&catalog.declarations()).unwrap();
        let entry = profile.get(ids::CPU_MAX_FREQ_MHZ).unwrap();

        let policy0 = root.path().join("sys/devices/system/cpu/cpufreq/policy0/cpuinfo_max_freq");
        assert_eq!(entry.value(), Some(&FactValue::Integer(2800)));
        assert_eq!(entry.source_used(), Some(policy0.display().to_string().as_str()));
        assert_eq!(entry.attempts.len(), 1);
        assert!(entry.attempts.iter().all(|a| !a.source.starts_with("lscpu")));
    }

    #[test]
    fn test_discovered_policies_in_numeric_order() {
        let root = TempDir::new().unwrap();
        write(&root, "sys/devices/system/cpu/cpufreq/policy10/cpuinfo_max_freq", "3000000");
        write(&root, "sys/devices/system/cpu/cpufreq/policy2/cpuinfo_max_freq", "2000000");
        std::fs::create_dir_all(root.path().join("sys/devices/system/cpu/cpufreq/policy0")).unwrap();

        let catalog = FactCatalog::new(&config(&root));
        let candidates = catalog.max_frequency_candidates();
        let names: Vec<String> = candidates
            .iter()
            .map(|p| p.strip_prefix(root.path()).unwrap().display().to_string())
            .collect();

        assert_eq!(names, vec![
            "sys/devices/system/cpu/cpufreq/policy0/cpuinfo_max_freq".to_string(),
            "sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq".to_string(),
            "sys/devices/system/cpu/cpufreq/policy2/cpuinfo_max_freq".to_string(),
            "sys/devices/system/cpu/cpufreq/policy10/cpuinfo_max_freq".to_string(),
        ]);

        let profile = ProfileBuilder::new().build(&catalog.group(FactGroup::Cpu)).unwrap();
        assert_eq!(profile.u64(ids::CPU_MAX_FREQ_MHZ), Some(2000));
    }

    #[test]
    fn test_missing_frequency_is_not_supported_and_profile_completes() {
        let root = TempDir::new().unwrap();
        write(&root, "etc/os-release", "PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\n");
        write(&root, "proc/meminfo", "MemTotal:        8000000 kB\nMemAvailable:    4000000 kB\n");
        write(&root, "sys/devices/system/cpu/online", "0-3\n");

        let catalog = FactCatalog::new(&config(&root));
        let declarations = catalog.declarations();
        let profile = ProfileBuilder::new().build(&declarations).unwrap();

        assert_eq!(profile.len(), declarations.len());
        let freq = profile.get(ids::CPU_MAX_FREQ_MHZ).unwrap();
        assert_eq!(freq.reason(), Some(UnavailableReason::NotSupported));
        assert_eq!(freq.attempts.last().map(|a| a.outcome), Some(AttemptOutcome::Failed(UnavailableReason::NotSupported)));

        assert_eq!(profile.text(ids::OS_NAME), Some("Debian GNU/Linux 12 (bookworm)"));
        assert_eq!(profile.u64(ids::MEM_TOTAL_BYTES), Some(8_000_000 * 1024));
        assert_eq!(profile.u64(ids::CPU_LOGICAL_CORES), Some(4));
    }

    #[test]
    fn test_core_frequencies_from_cpuinfo() {
        let root = TempDir::new().unwrap();
        let cpuinfo: String = (0..10)
            .map(|i| format!("processor\t: {}\ncpu MHz\t\t: {}.5\n\n", i, 2000 + i))
            .collect();
        write(&root, "proc/cpuinfo", &cpuinfo);
        let mut config = config(&root);
        config.groups = vec![FactGroup::Cpu];

        let profile = ProfileBuilder::new()
            .build(&FactCatalog::new(&config).declarations())
            .unwrap();
        let freqs = profile.value(ids::CPU_CORE_FREQS_MHZ).and_then(FactValue::as_list).unwrap();
        assert_eq!(freqs.len(), 8);
        assert_eq!(freqs[0], "2000.50");
        assert_eq!(freqs[7], "2007.50");
        assert_eq!(profile.u64(ids::CPU_LOGICAL_CORES), Some(10));
    }

    #[test]
    fn test_skip_network_leaves_public_ip_without_sources() {
        let root = TempDir::new().unwrap();
        let mut config = config(&root);
        config.skip_network = true;

        let declarations = FactCatalog::new(&config).group(FactGroup::Network);
        let public_ip = declarations.iter().find(|d| d.id() == ids::NET_PUBLIC_IP).unwrap();
        assert!(public_ip.sources.is_empty());

        config.skip_network = false;
        let declarations = FactCatalog::new(&config).group(FactGroup::Network);
        let public_ip = declarations.iter().find(|d| d.id() == ids::NET_PUBLIC_IP).unwrap();
        assert_eq!(public_ip.sources.len(), 1);
        assert!(public_ip.source_names()[0].starts_with("curl|wget"));
    }

    #[cfg(unix)]
    fn fake_tool(dir: &TempDir, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    fn public_ip_profile(bin: &TempDir) -> (HostProfile, std::time::Duration) {
        let root = TempDir::new().unwrap();
        let mut config = config(&root);
        config.search_path = Some(vec![bin.path().to_path_buf()]);
        config.network_timeout = std::time::Duration::from_millis(300);

        let start = std::time::Instant::now();
        let profile = ProfileBuilder::new()
            .build(&FactCatalog::new(&config).group(FactGroup::Network))
            .unwrap();
        (profile, start.elapsed())
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_public_ip_tools_time_out_within_network_timeout() {
        let bin = TempDir::new().unwrap();
        fake_tool(&bin, "curl", "exec sleep 5");
        fake_tool(&bin, "wget", "exec sleep 5");

        let (profile, elapsed) = public_ip_profile(&bin);
        let entry = profile.get(ids::NET_PUBLIC_IP).unwrap();
        assert_eq!(entry.reason(), Some(UnavailableReason::Timeout));
        assert_eq!(entry.attempts.len(), 1);
        assert!(elapsed < std::time::Duration::from_millis(800), "took {:?}", elapsed);
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_curl_without_wget_reports_timeout() {
        let bin = TempDir::new().unwrap();
        fake_tool(&bin, "curl", "exec sleep 5");

        let (profile, _) = public_ip_profile(&bin);
        assert_eq!(
            profile.get(ids::NET_PUBLIC_IP).and_then(|r| r.reason()),
            Some(UnavailableReason::Timeout)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_public_ip_falls_back_to_wget() {
        let bin = TempDir::new().unwrap();
        fake_tool(&bin, "curl", "exit 6");
        fake_tool(&bin, "wget", "echo 203.0.113.7");

        let (profile, _) = public_ip_profile(&bin);
        assert_eq!(profile.text(ids::NET_PUBLIC_IP), Some("203.0.113.7"));
    }

    #[test]
    fn test_interfaces_from_sys_class_net() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("sys/class/net/lo")).unwrap();
        std::fs::create_dir_all(root.path().join("sys/class/net/eth0")).unwrap();

        let profile = ProfileBuilder::new()
            .build(&FactCatalog::new(&config(&root)).group(FactGroup::Network))
            .unwrap();
        assert_eq!(
            profile.value(ids::NET_INTERFACES),
            Some(&FactValue::List(vec!["eth0".to_string(), "lo".to_string()]))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_version_from_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let script = bin.path().join("faketool");
        std::fs::write(&script, "#!/bin/sh\necho \"faketool version 1.2.3 (build abc)\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = config(&root);
        config.search_path = Some(vec![bin.path().to_path_buf()]);
        config.tools = vec!["faketool".to_string(), "absenttool".to_string()];

        let profile = ProfileBuilder::new()
            .build(&FactCatalog::new(&config).group(FactGroup::Tools))
            .unwrap();

        assert_eq!(profile.text(&tool_fact_id("faketool")), Some("1.2.3"));
        assert_eq!(
            profile.get(&tool_fact_id("absenttool")).and_then(|r| r.reason()),
            Some(UnavailableReason::NotSupported)
        );
    }
}
