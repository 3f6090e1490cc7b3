//! Fact probing and tiered resolution
//!
//! A [`ValueSource`] tries to read one fact from one mechanism (a file,
//! a command, an in-process API). The [`TieredResolver`] walks an ordered
//! list of sources for a fact and stops at the first one that works.

mod command;
mod fact;
pub mod parsers;
mod resolver;
mod source;

pub use command::*;
pub use fact::*;
pub use resolver::*;
pub use source::*;

#[cfg(test)]
pub(crate) use resolver::tests;
