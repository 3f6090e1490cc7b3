//! Host profile construction
//!
//! Declares the facts a run reports, resolves them concurrently with the
//! tiered resolver, and exposes the result as an ordered, immutable
//! [`HostProfile`].

mod builder;
mod catalog;
mod declaration;
mod host;

pub use builder::*;
pub use catalog::*;
pub use declaration::*;
pub use host::*;
