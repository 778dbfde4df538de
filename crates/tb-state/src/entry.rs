// entry.rs — StateEntry: one TTL-scoped value in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known namespace names.
///
/// Each gate owns exactly one namespace and never writes another gate's.
/// The constants live here so the owning crate and the CLI agree on
/// spelling.
pub mod ns {
    /// Duplicate-call signatures and the session waste total.
    pub const CALL_HISTORY: &str = "call-history";
    /// Files touched by allowed write/edit events in the current task.
    pub const MODIFIED_FILES: &str = "modified-files";
    /// Capability grants, keyed by agent id.
    pub const CAPABILITY_REGISTRY: &str = "capability-registry";
    /// The current workflow phase and its transition history.
    pub const PHASE_STATE: &str = "phase-state";
    /// The current task's declared boundaries.
    pub const TASK_SCOPE: &str = "task-scope";
    /// Active and resolved flags, plus checklist items.
    pub const FLAGS: &str = "flags";
    /// The outstanding mandatory question, if any.
    pub const PENDING_QUESTION: &str = "pending-question";
}

/// A single stored value with its write time and optional TTL.
///
/// Entries past their TTL are logically deleted: reads treat them exactly
/// like a missing key, and the store prunes them lazily on access.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateEntry {
    /// The stored value. Any JSON shape; callers deserialize as needed.
    pub value: serde_json::Value,

    /// When this entry was written.
    pub written_at: DateTime<Utc>,

    /// Seconds until this entry is treated as absent. `None` = no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

impl StateEntry {
    /// Create an entry written now.
    pub fn new(value: serde_json::Value, ttl_seconds: Option<u64>) -> Self {
        Self {
            value,
            written_at: Utc::now(),
            ttl_seconds,
        }
    }

    /// Whether this entry has outlived its TTL as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl_seconds {
            Some(ttl) => {
                let age = now.signed_duration_since(self.written_at).num_seconds();
                age >= ttl as i64
            }
            None => false,
        }
    }
}
