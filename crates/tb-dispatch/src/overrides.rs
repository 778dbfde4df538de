// overrides.rs — Explicit bypass switches.
//
// The legacy pattern here is an environment flag the gate silently reads.
// Tollbooth makes the bypass an explicit value the host passes in, and
// the dispatcher records every use in the response annotations and the
// decision log, so audit trails stay truthful.

use serde::{Deserialize, Serialize};

/// Override switches for one evaluation. All default to off.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverrideContext {
    /// Force ALLOW past the workflow phase gate.
    pub phase: bool,
    /// Force ALLOW past the task scope gate.
    pub scope: bool,
}

impl OverrideContext {
    /// No overrides: the normal case.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether any switch is set.
    pub fn any(&self) -> bool {
        self.phase || self.scope
    }
}
