//! Configuration module for HostProbe
//!
//! Provides CLI arguments and the runtime settings for fact resolution
//! and the benchmark battery.

mod settings;

pub use settings::*;
