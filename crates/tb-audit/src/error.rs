// error.rs — Error types for the decision log.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing or verifying the decision log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the log file.
    #[error("failed to open decision log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a record to the log.
    #[error("failed to append record: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Failed to serialize or deserialize a record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The hash chain is broken: the log has been tampered with.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },
}
