//! Execution environment detection
//!
//! Identifies the CI provider and container runtime a run happens in,
//! through ordered capability checks resolved with the same tiered
//! pattern as every other fact.

mod detector;

pub use detector::*;
