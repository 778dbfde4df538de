// verdict.rs — Verdict lattice and per-gate annotations.
//
// Every gate produces at most one annotation per evaluation. The merged
// verdict is the maximum over the lattice Allow < Warn < Block, so
// deriving Ord on the variant order gives the merge for free.

use serde::{Deserialize, Serialize};

/// The outcome of one gate, or of the merged pipeline.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The action may proceed.
    #[default]
    Allow,
    /// The action may proceed, but the caller must surface the warning.
    Warn,
    /// The action must not proceed.
    Block,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Allow => write!(f, "ALLOW"),
            Verdict::Warn => write!(f, "WARN"),
            Verdict::Block => write!(f, "BLOCK"),
        }
    }
}

/// Machine-readable detail attached to an annotation, one variant per
/// gate concern. Tagged so hosts can dispatch on `kind` without parsing
/// the human-readable explanation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detail {
    /// A required capability is missing from the actor's grant.
    MissingCapability { required: String },

    /// A forward phase jump skipped required phases.
    PhaseJump {
        from: String,
        to: String,
        missing: Vec<String>,
        suggested_next: String,
    },

    /// A write/edit target fell outside the task's declared paths.
    PathOutOfScope {
        path: String,
        allowed: Vec<String>,
        remedies: Vec<String>,
    },

    /// A shell command fell outside the task's declared patterns.
    CommandOutOfScope { command: String, suggestion: String },

    /// Active BLOCKER flags.
    ActiveBlockers { flag_ids: Vec<String> },

    /// Active WARNING flags past the configured threshold.
    WarningFlags { count: usize, threshold: usize },

    /// Incomplete checklist items on a completion-signaling event.
    ChecklistIncomplete {
        p0_unverified: Vec<String>,
        p1_unverified: Vec<String>,
    },

    /// A mandatory question is outstanding.
    QuestionPending {
        question: String,
        answer_tool: String,
        violation_count: u64,
    },

    /// Duplicate-call analysis (advisory; never blocks).
    DuplicateCall {
        classification: String,
        occurrence_count: u64,
        estimated_waste: u64,
        session_waste_estimate: u64,
        suggestion: Option<String>,
    },

    /// An override switch forced this gate to ALLOW.
    Overridden { would_have_blocked: bool },

    /// The state store could not be reached; the gate degraded to ALLOW.
    StoreUnavailable { error: String },
}

/// One gate's contribution to the response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateAnnotation {
    /// Which gate produced this (e.g., "task_scope").
    pub gate: String,
    /// The gate's verdict.
    pub verdict: Verdict,
    /// Human-readable explanation: reason, policy, and remedy.
    pub explanation: String,
    /// Machine-readable fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Detail>,
}

impl GateAnnotation {
    /// Build an annotation.
    pub fn new(gate: &str, verdict: Verdict, explanation: impl Into<String>) -> Self {
        Self {
            gate: gate.to_string(),
            verdict,
            explanation: explanation.into(),
            detail: None,
        }
    }

    /// Attach machine-readable detail (builder pattern).
    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Merge per-gate verdicts: BLOCK dominates WARN dominates ALLOW.
pub fn merge_verdicts<'a, I>(verdicts: I) -> Verdict
where
    I: IntoIterator<Item = &'a Verdict>,
{
    verdicts.into_iter().copied().max().unwrap_or(Verdict::Allow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_dominates_warn_dominates_allow() {
        assert!(Verdict::Allow < Verdict::Warn);
        assert!(Verdict::Warn < Verdict::Block);

        assert_eq!(
            merge_verdicts(&[Verdict::Allow, Verdict::Warn, Verdict::Allow]),
            Verdict::Warn
        );
        assert_eq!(
            merge_verdicts(&[Verdict::Warn, Verdict::Block, Verdict::Allow]),
            Verdict::Block
        );
        assert_eq!(merge_verdicts(&[]), Verdict::Allow);
    }

    #[test]
    fn verdict_serializes_screaming() {
        assert_eq!(serde_json::to_string(&Verdict::Block).unwrap(), "\"BLOCK\"");
        assert_eq!(serde_json::to_string(&Verdict::Allow).unwrap(), "\"ALLOW\"");
    }

    #[test]
    fn annotation_serialization_round_trip() {
        let ann = GateAnnotation::new("capability", Verdict::Block, "missing file_write")
            .with_detail(Detail::MissingCapability {
                required: "file_write".to_string(),
            });
        let json = serde_json::to_string(&ann).unwrap();
        assert!(json.contains("\"kind\":\"missing_capability\""));
        let restored: GateAnnotation = serde_json::from_str(&json).unwrap();
        assert_eq!(ann, restored);
    }
}
