// error.rs — Error types for the state store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting state.
///
/// Read-side problems (missing file, corrupt JSON) are deliberately NOT
/// represented here: the store self-heals those into an empty namespace.
/// Only write-side failures surface, and callers are expected to degrade
/// gracefully rather than abort the evaluation.
#[derive(Debug, Error)]
pub enum StateError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize state for writing.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
