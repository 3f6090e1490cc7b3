//! Value sources
//!
//! Every source reports expected absence (missing file, missing binary,
//! unparsable output) as an [`UnavailableReason`], never as a panic or a
//! crate error.

use super::FactValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a source could not produce a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnavailableReason {
    /// The mechanism does not exist on this host
    NotSupported,
    /// The mechanism exists but may not be read
    PermissionDenied,
    /// The mechanism did not answer in time
    Timeout,
    /// The mechanism answered with something unparsable
    MalformedOutput,
}

impl UnavailableReason {
    /// Map an I/O error from a read or spawn onto a reason
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::TimedOut => Self::Timeout,
            std::io::ErrorKind::InvalidData => Self::MalformedOutput,
            _ => Self::NotSupported,
        }
    }

    /// Name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotSupported => "NotSupported",
            Self::PermissionDenied => "PermissionDenied",
            Self::Timeout => "Timeout",
            Self::MalformedOutput => "MalformedOutput",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a single source attempt
pub type SourceOutcome = std::result::Result<FactValue, UnavailableReason>;

/// Parser turning raw text into a value; `None` means malformed
pub type Parser = Box<dyn Fn(&str) -> Option<FactValue> + Send + Sync>;

/// One mechanism able to produce one fact
///
/// Sources are stateless and may be attempted any number of times.
pub trait ValueSource: Send + Sync {
    /// Stable label reported as the source used (path, command line, API)
    fn name(&self) -> &str;

    /// Try to read the value
    fn attempt(&self) -> SourceOutcome;
}

impl fmt::Debug for dyn ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueSource({})", self.name())
    }
}

/// Reads a file and parses its contents
pub struct FileSource {
    path: PathBuf,
    label: String,
    parser: Parser,
}

impl FileSource {
    /// Create a file source
    pub fn new<F>(path: impl Into<PathBuf>, parser: F) -> Self
    where
        F: Fn(&str) -> Option<FactValue> + Send + Sync + 'static,
    {
        let path = path.into();
        let label = path.display().to_string();
        Self {
            path,
            label,
            parser: Box::new(parser),
        }
    }
}

impl ValueSource for FileSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn attempt(&self) -> SourceOutcome {
        let content = std::fs::read_to_string(&self.path).map_err(|e| UnavailableReason::from_io(&e))?;
        (self.parser)(&content).ok_or(UnavailableReason::MalformedOutput)
    }
}

/// An in-process probe (system API, environment variable, directory listing)
pub struct FnSource {
    label: String,
    probe: Box<dyn Fn() -> SourceOutcome + Send + Sync>,
}

impl FnSource {
    /// Create a source from a probe closure
    pub fn new<F>(label: impl Into<String>, probe: F) -> Self
    where
        F: Fn() -> SourceOutcome + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            probe: Box::new(probe),
        }
    }

    /// Create a source whose probe returns `None` when the mechanism is absent
    pub fn optional<F>(label: impl Into<String>, probe: F) -> Self
    where
        F: Fn() -> Option<FactValue> + Send + Sync + 'static,
    {
        Self::new(label, move || probe().ok_or(UnavailableReason::NotSupported))
    }
}

impl ValueSource for FnSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn attempt(&self) -> SourceOutcome {
        (self.probe)()
    }
}
