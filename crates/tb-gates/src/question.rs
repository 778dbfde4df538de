// question.rs — The pending-question lock.
//
// When a mandatory question is outstanding, every event is blocked except
// the one designated answer tool. This gate runs first in the pipeline
// and dominates all others: there is no point evaluating scope or phase
// for work the agent is not allowed to continue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_event::ClassifiedEvent;

use crate::verdict::{Detail, GateAnnotation, Verdict};

/// Name of this gate in annotations.
pub const GATE: &str = "pending_question";

/// An outstanding mandatory question.
///
/// Cleared only by the designated answer tool; every blocked attempt
/// while pending increments `violation_count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingQuestion {
    /// What was asked.
    pub question: String,
    /// The tool whose invocation counts as answering.
    pub answer_tool: String,
    /// When the question was raised.
    pub asked_at: DateTime<Utc>,
    /// Blocked attempts since the question was raised.
    pub violation_count: u64,
}

impl PendingQuestion {
    /// Raise a question that must be answered via `answer_tool`.
    pub fn new(question: impl Into<String>, answer_tool: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer_tool: answer_tool.into().to_ascii_lowercase(),
            asked_at: Utc::now(),
            violation_count: 0,
        }
    }

    /// Whether this event is the designated answer.
    pub fn is_answer(&self, event: &ClassifiedEvent) -> bool {
        event.event.tool_name.eq_ignore_ascii_case(&self.answer_tool)
    }
}

/// The pending-question gate.
///
/// The block message carries the violation count *including* this
/// attempt, so the caller sees escalating non-compliance; the dispatcher
/// persists the increment.
pub fn check(event: &ClassifiedEvent, question: Option<&PendingQuestion>) -> Option<GateAnnotation> {
    let question = question?;
    if question.is_answer(event) {
        return None;
    }

    let count = question.violation_count + 1;
    Some(
        GateAnnotation::new(
            GATE,
            Verdict::Block,
            format!(
                "a mandatory question is unanswered ({count} blocked attempt(s) so far): \
                 \"{}\" — answer it via '{}' before doing anything else",
                question.question, question.answer_tool,
            ),
        )
        .with_detail(Detail::QuestionPending {
            question: question.question.clone(),
            answer_tool: question.answer_tool.clone(),
            violation_count: count,
        }),
    )
}
