//! Error types for HostProbe
//!
//! Only failures that stop the whole pipeline live here. A probe that
//! cannot read a fact is not an error: it is recorded as an
//! [`UnavailableReason`](crate::probe::UnavailableReason) on the fact.

use thiserror::Error;

/// Main error type for HostProbe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    /// I/O error outside of fact resolution (writing a report, etc.)
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What was being done
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Fact declarations are inconsistent (duplicate id, unknown or cyclic dependency)
    #[error("Invalid fact declaration: {0}")]
    InvalidDeclaration(String),

    /// Thread pool error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ProbeError {
    /// Create an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create an invalid declaration error
    pub fn declaration(message: impl Into<String>) -> Self {
        Self::InvalidDeclaration(message.into())
    }
}

/// Result type alias for HostProbe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::Io {
            context: "writing output".to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::SerializationError(err.to_string())
    }
}

/// Failure of a single benchmark workload
///
/// Recorded on the failing case; the remaining cases still run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    /// The workload could not allocate its working set
    #[error("failed to allocate {bytes} bytes for the workload")]
    Allocation {
        /// Size of the failed reservation
        bytes: usize,
    },

    /// The workload was configured with an unusable size
    #[error("invalid workload input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_context() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = ProbeError::io("rendering report", io_err);
        assert_eq!(err.to_string(), "I/O error while rendering report: pipe closed");
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: ProbeError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, ProbeError::SerializationError(_)));
    }

    #[test]
    fn test_workload_error_display() {
        let err = WorkloadError::Allocation { bytes: 4096 };
        assert_eq!(err.to_string(), "failed to allocate 4096 bytes for the workload");
    }
}
