// error.rs — Error types for gate state manipulation.
//
// Gate *checks* never error (violations are verdicts, not errors); these
// surface only from explicit state mutations like a phase transition.

use thiserror::Error;

/// Errors from validated state mutations and parsing.
#[derive(Debug, Error)]
pub enum GateError {
    /// A phase name did not parse.
    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    /// An explicit phase transition violated the transition rules.
    #[error("invalid phase transition from {from} to {to}; missing phase(s): {}", missing.join(", "))]
    InvalidPhaseTransition {
        from: String,
        to: String,
        missing: Vec<String>,
    },

    /// A capability name did not parse.
    #[error("unknown capability: {0}")]
    UnknownCapability(String),
}
