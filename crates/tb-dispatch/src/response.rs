// response.rs — The structured response returned for every evaluation.

use serde::{Deserialize, Serialize};
use tb_gates::{merge_verdicts, GateAnnotation, Verdict};

/// The merged result of one tool-call evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResponse {
    /// The merged verdict: BLOCK dominates WARN dominates ALLOW.
    pub verdict: Verdict,
    /// Every gate's contribution, blocking explanations included.
    pub annotations: Vec<GateAnnotation>,
    /// The overall exit signal: `true` unless the verdict is BLOCK.
    pub passed: bool,
}

impl GateResponse {
    /// Merge annotations into a response.
    pub fn from_annotations(annotations: Vec<GateAnnotation>) -> Self {
        let verdict = merge_verdicts(annotations.iter().map(|a| &a.verdict));
        Self {
            verdict,
            annotations,
            passed: verdict != Verdict::Block,
        }
    }

    /// Every annotation that blocked, for hosts that want the reasons.
    pub fn blocking(&self) -> impl Iterator<Item = &GateAnnotation> {
        self.annotations
            .iter()
            .filter(|a| a.verdict == Verdict::Block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_annotations_allow() {
        let response = GateResponse::from_annotations(vec![]);
        assert_eq!(response.verdict, Verdict::Allow);
        assert!(response.passed);
    }

    #[test]
    fn any_block_fails_the_exit_signal() {
        let response = GateResponse::from_annotations(vec![
            GateAnnotation::new("capability", Verdict::Allow, "ok"),
            GateAnnotation::new("task_scope", Verdict::Block, "out of scope"),
            GateAnnotation::new("flags", Verdict::Warn, "warnings piling up"),
        ]);
        assert_eq!(response.verdict, Verdict::Block);
        assert!(!response.passed);
        assert_eq!(response.blocking().count(), 1);
    }

    #[test]
    fn warn_passes_but_is_surfaced() {
        let response = GateResponse::from_annotations(vec![GateAnnotation::new(
            "flags",
            Verdict::Warn,
            "4 warnings",
        )]);
        assert_eq!(response.verdict, Verdict::Warn);
        assert!(response.passed);
        assert_eq!(response.annotations.len(), 1);
    }
}
