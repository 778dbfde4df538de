// error.rs — Error types for dispatcher construction and administration.
//
// Evaluation itself never errors: policy violations are verdicts, and
// store failures degrade to ALLOW-with-warning. Errors here come from
// opening the engine (bad paths) and from explicit admin operations.

use thiserror::Error;

/// Errors from engine setup and session administration.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The state store could not be opened or written.
    #[error(transparent)]
    State(#[from] tb_state::StateError),

    /// The decision log could not be opened or written.
    #[error(transparent)]
    Audit(#[from] tb_audit::AuditError),

    /// A validated state mutation was rejected.
    #[error(transparent)]
    Gate(#[from] tb_gates::GateError),

    /// An admin operation referenced something that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}
