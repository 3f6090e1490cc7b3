//! Progress reporting module
//!
//! Terminal feedback while facts resolve and benchmarks run.

mod reporter;

pub use reporter::*;
