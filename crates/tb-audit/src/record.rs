// record.rs — DecisionRecord: one evaluated tool call, one line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_gates::{GateAnnotation, Verdict};
use uuid::Uuid;

/// One line in the decision log: which call was evaluated, what every
/// gate said, and whether an override forced the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Unique identifier for this record.
    pub record_id: Uuid,

    /// When the evaluation happened.
    pub timestamp: DateTime<Utc>,

    /// The acting agent, if one was identified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,

    /// The tool that was attempted.
    pub tool_name: String,

    /// The merged pipeline verdict.
    pub verdict: Verdict,

    /// Every gate's contribution, overrides included.
    pub annotations: Vec<GateAnnotation>,

    /// Names of gates whose BLOCK was overridden, empty when none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overridden_gates: Vec<String>,

    /// Hash of the previous record's JSON line; `None` for the first.
    pub previous_hash: Option<String>,
}

impl DecisionRecord {
    /// Build a record for one evaluation. The chain link is filled in by
    /// the log on append.
    pub fn new(
        actor_id: Option<String>,
        tool_name: impl Into<String>,
        verdict: Verdict,
        annotations: Vec<GateAnnotation>,
        overridden_gates: Vec<String>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            tool_name: tool_name.into(),
            verdict,
            annotations,
            overridden_gates,
            previous_hash: None,
        }
    }
}
