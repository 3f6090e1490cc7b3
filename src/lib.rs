//! # HostProbe - Host Capability Probe for CI Runners
//!
//! HostProbe answers two questions about the machine a job lands on: what
//! is this host, and how fast is it. It is meant to run on CI runners and
//! in containers where the usual tools may be missing, restricted or slow.
//!
//! ## Features
//!
//! - **Tiered Fact Resolution**: Every fact has an ordered list of sources
//!   (files, commands, in-process APIs); the first one that answers wins
//! - **Bounded Parallelism**: Facts resolve concurrently on a sized pool,
//!   each command under its own timeout
//! - **Explicit Unavailability**: A fact no source could produce carries a
//!   reason instead of a placeholder value
//! - **Environment Detection**: CI provider and container runtime
//! - **Micro-benchmarks**: Arithmetic, recursion, sieve and sort workloads
//!   rated into performance tiers
//! - **Core Power Estimate**: cores × clock × IPC
//!
//! ## Quick Start
//!
//! ```no_run
//! use hostprobe::config::ProbeConfig;
//! use hostprobe::profile::{FactCatalog, ProfileBuilder};
//!
//! let config = ProbeConfig::default();
//! let catalog = FactCatalog::new(&config);
//! let profile = ProfileBuilder::from_config(&config)
//!     .build(&catalog.declarations())
//!     .unwrap();
//!
//! for entry in profile.iter() {
//!     println!("{} = {:?}", entry.id(), entry.value());
//! }
//! ```
//!
//! ## Benchmarks
//!
//! ```no_run
//! use hostprobe::bench::{default_battery, BenchmarkRunner};
//! use hostprobe::config::BenchmarkConfig;
//!
//! let results = BenchmarkRunner::new().run(&default_battery(&BenchmarkConfig::default()));
//! for result in &results {
//!     println!("{}: {:?}", result.name, result.tier());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bench;
pub mod config;
pub mod environment;
pub mod error;
pub mod probe;
pub mod profile;
pub mod progress;
pub mod report;

// Re-export commonly used types
pub use config::{BenchmarkConfig, ProbeConfig};
pub use error::{ProbeError, Result};
pub use profile::{FactCatalog, HostProfile, ProfileBuilder};
pub use progress::ProgressReporter;
pub use report::Report;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use hostprobe::prelude::*;
    //! ```

    pub use crate::bench::{default_battery, BenchmarkCase, BenchmarkResult, BenchmarkRunner, PerformanceTier};
    pub use crate::config::{BenchmarkConfig, FactGroup, ProbeConfig};
    pub use crate::environment::{EnvironmentDescriptor, EnvironmentDetector};
    pub use crate::error::{ProbeError, Result};
    pub use crate::probe::{Fact, FactValue, TieredResolver, UnavailableReason, ValueSource};
    pub use crate::profile::{FactCatalog, FactDeclaration, HostProfile, ProfileBuilder};
    pub use crate::progress::ProgressReporter;
    pub use crate::report::{render_json, Report, TextRenderer};
}
