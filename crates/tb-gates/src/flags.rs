// flags.rs — Flags, checklists, and the flag/checklist gate.
//
// Flags are raised by any collaborator to signal a problem. An active
// BLOCKER stops all mutating work unconditionally; WARNING flags past the
// configured threshold produce a non-blocking warning. Completion events
// (marking a task done, committing) additionally require the current
// phase's P0 checklist items to be verified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_event::ClassifiedEvent;
use uuid::Uuid;

use crate::config::GateConfig;
use crate::phase::{is_commit_command, Phase};
use crate::verdict::{Detail, GateAnnotation, Verdict};

/// Name of this gate in annotations.
pub const GATE: &str = "flags";

/// How serious a flag is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagKind {
    /// Absolute gate condition: mutating work stops until resolved.
    Blocker,
    /// Counts toward the warning threshold.
    Warning,
    /// Informational only; never affects verdicts.
    Info,
}

/// Whether a flag is still in force.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Active,
    Resolved,
}

/// A problem signal raised by a collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flag {
    pub id: Uuid,
    pub kind: FlagKind,
    /// The task this flag concerns, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub message: String,
    pub status: FlagStatus,
    pub raised_at: DateTime<Utc>,
}

impl Flag {
    /// Raise a new, active flag.
    pub fn raise(kind: FlagKind, task_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            task_id,
            message: message.into(),
            status: FlagStatus::Active,
            raised_at: Utc::now(),
        }
    }

    fn is_active(&self, kind: FlagKind) -> bool {
        self.status == FlagStatus::Active && self.kind == kind
    }
}

/// Checklist item priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Must be verified before completion.
    P0,
    /// Should be verified; incomplete items warn only.
    P1,
}

/// One checklist item, scoped to a phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub phase: Phase,
    pub priority: Priority,
    pub description: String,
    pub verified: bool,
}

impl ChecklistItem {
    /// Add an unverified checklist item for a phase.
    pub fn new(phase: Phase, priority: Priority, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase,
            priority,
            description: description.into(),
            verified: false,
        }
    }
}

/// Whether this event signals completion (and so triggers checklist
/// enforcement on top of flag enforcement).
pub fn is_completion_event(event: &ClassifiedEvent, config: &GateConfig) -> bool {
    config.is_completion_tool(&event.event.tool_name.to_ascii_lowercase())
        || event.command.as_deref().is_some_and(is_commit_command)
}

/// The flag/checklist gate.
pub fn check(
    event: &ClassifiedEvent,
    flags: &[Flag],
    checklist: &[ChecklistItem],
    current_phase: Phase,
    config: &GateConfig,
) -> Option<GateAnnotation> {
    let completion = is_completion_event(event, config);
    if !event.intent.is_mutating() && !completion {
        return None;
    }

    // Active blockers stop everything, with every blocker enumerated.
    let blockers: Vec<&Flag> = flags.iter().filter(|f| f.is_active(FlagKind::Blocker)).collect();
    if !blockers.is_empty() {
        let listing: Vec<String> = blockers
            .iter()
            .map(|f| format!("{}: {}", f.id, f.message))
            .collect();
        return Some(
            GateAnnotation::new(
                GATE,
                Verdict::Block,
                format!(
                    "{} unresolved BLOCKER flag(s) must be resolved first: {}",
                    blockers.len(),
                    listing.join("; "),
                ),
            )
            .with_detail(Detail::ActiveBlockers {
                flag_ids: blockers.iter().map(|f| f.id.to_string()).collect(),
            }),
        );
    }

    // Completion events require the current phase's P0 items verified.
    if completion {
        let unverified = |p: Priority| -> Vec<String> {
            checklist
                .iter()
                .filter(|i| i.phase == current_phase && i.priority == p && !i.verified)
                .map(|i| i.description.clone())
                .collect()
        };
        let p0 = unverified(Priority::P0);
        let p1 = unverified(Priority::P1);

        if !p0.is_empty() {
            return Some(
                GateAnnotation::new(
                    GATE,
                    Verdict::Block,
                    format!(
                        "cannot signal completion: {} unverified P0 checklist item(s) \
                         for the {current_phase} phase: {}",
                        p0.len(),
                        p0.join("; "),
                    ),
                )
                .with_detail(Detail::ChecklistIncomplete {
                    p0_unverified: p0,
                    p1_unverified: p1,
                }),
            );
        }
        if !p1.is_empty() {
            return Some(
                GateAnnotation::new(
                    GATE,
                    Verdict::Warn,
                    format!(
                        "completing with {} unverified P1 checklist item(s): {}",
                        p1.len(),
                        p1.join("; "),
                    ),
                )
                .with_detail(Detail::ChecklistIncomplete {
                    p0_unverified: Vec::new(),
                    p1_unverified: p1,
                }),
            );
        }
    }

    // Warning flags past the threshold produce a non-blocking warning.
    let warnings: Vec<&Flag> = flags.iter().filter(|f| f.is_active(FlagKind::Warning)).collect();
    if warnings.len() > config.warning_flag_threshold {
        let listing: Vec<String> = warnings.iter().map(|f| f.message.clone()).collect();
        return Some(
            GateAnnotation::new(
                GATE,
                Verdict::Warn,
                format!(
                    "{} active WARNING flags (threshold {}): {}",
                    warnings.len(),
                    config.warning_flag_threshold,
                    listing.join("; "),
                ),
            )
            .with_detail(Detail::WarningFlags {
                count: warnings.len(),
                threshold: config.warning_flag_threshold,
            }),
        );
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tb_event::{classify, ToolCallEvent};

    fn classified(tool: &str, params: serde_json::Value) -> ClassifiedEvent {
        classify(ToolCallEvent::from_value(
            json!({ "tool_name": tool, "parameters": params }),
        ))
    }

    fn write_event() -> ClassifiedEvent {
        classified("write_file", json!({ "file_path": "src/a.rs" }))
    }

    #[test]
    fn active_blocker_blocks_writes() {
        let config = GateConfig::default();
        let flags = vec![Flag::raise(FlagKind::Blocker, None, "review found a data race")];

        let annotation = check(&write_event(), &flags, &[], Phase::Implement, &config)
            .expect("active blocker must block");
        assert_eq!(annotation.verdict, Verdict::Block);
        assert!(annotation.explanation.contains("data race"));
    }

    #[test]
    fn resolved_blocker_does_not_block() {
        let config = GateConfig::default();
        let mut flag = Flag::raise(FlagKind::Blocker, None, "fixed now");
        flag.status = FlagStatus::Resolved;

        assert!(check(&write_event(), &[flag], &[], Phase::Implement, &config).is_none());
    }

    #[test]
    fn blocker_enumerates_every_blocker() {
        let config = GateConfig::default();
        let flags = vec![
            Flag::raise(FlagKind::Blocker, None, "first"),
            Flag::raise(FlagKind::Blocker, None, "second"),
        ];
        let annotation = check(&write_event(), &flags, &[], Phase::Implement, &config).unwrap();
        match annotation.detail {
            Some(Detail::ActiveBlockers { flag_ids }) => assert_eq!(flag_ids.len(), 2),
            other => panic!("expected ActiveBlockers, got {other:?}"),
        }
    }

    #[test]
    fn reads_pass_even_with_blockers() {
        let config = GateConfig::default();
        let flags = vec![Flag::raise(FlagKind::Blocker, None, "broken")];
        let event = classified("read_file", json!({ "file_path": "a.rs" }));
        assert!(check(&event, &flags, &[], Phase::Implement, &config).is_none());
    }

    #[test]
    fn warnings_at_threshold_allow_beyond_threshold_warn() {
        let config = GateConfig::default(); // threshold 3
        let mut flags: Vec<Flag> = (0..3)
            .map(|i| Flag::raise(FlagKind::Warning, None, format!("warning {i}")))
            .collect();

        // Exactly at the threshold: not yet exceeded.
        assert!(check(&write_event(), &flags, &[], Phase::Implement, &config).is_none());

        flags.push(Flag::raise(FlagKind::Warning, None, "one too many"));
        let annotation = check(&write_event(), &flags, &[], Phase::Implement, &config)
            .expect("four warnings must warn");
        assert_eq!(annotation.verdict, Verdict::Warn);
        match annotation.detail {
            Some(Detail::WarningFlags { count, threshold }) => {
                assert_eq!(count, 4);
                assert_eq!(threshold, 3);
            }
            other => panic!("expected WarningFlags, got {other:?}"),
        }
    }

    #[test]
    fn info_flags_never_affect_verdict() {
        let config = GateConfig::default();
        let flags: Vec<Flag> = (0..10)
            .map(|i| Flag::raise(FlagKind::Info, None, format!("note {i}")))
            .collect();
        assert!(check(&write_event(), &flags, &[], Phase::Implement, &config).is_none());
    }

    #[test]
    fn completion_with_unverified_p0_blocks() {
        let config = GateConfig::default();
        let checklist = vec![
            ChecklistItem::new(Phase::Implement, Priority::P0, "tests pass"),
            ChecklistItem::new(Phase::Implement, Priority::P1, "changelog updated"),
        ];
        let event = classified("mark_complete", json!({}));

        let annotation = check(&event, &[], &checklist, Phase::Implement, &config)
            .expect("unverified P0 must block completion");
        assert_eq!(annotation.verdict, Verdict::Block);
        assert!(annotation.explanation.contains("tests pass"));
    }

    #[test]
    fn completion_with_only_p1_unverified_warns() {
        let config = GateConfig::default();
        let mut p0 = ChecklistItem::new(Phase::Implement, Priority::P0, "tests pass");
        p0.verified = true;
        let checklist = vec![
            p0,
            ChecklistItem::new(Phase::Implement, Priority::P1, "changelog updated"),
        ];
        let event = classified("mark_complete", json!({}));

        let annotation = check(&event, &[], &checklist, Phase::Implement, &config)
            .expect("unverified P1 must warn");
        assert_eq!(annotation.verdict, Verdict::Warn);
    }

    #[test]
    fn checklist_items_for_other_phases_ignored() {
        let config = GateConfig::default();
        let checklist = vec![ChecklistItem::new(Phase::Review, Priority::P0, "sign-off")];
        let event = classified("mark_complete", json!({}));
        assert!(check(&event, &[], &checklist, Phase::Implement, &config).is_none());
    }

    #[test]
    fn git_commit_counts_as_completion() {
        let config = GateConfig::default();
        let checklist = vec![ChecklistItem::new(Phase::Implement, Priority::P0, "tests pass")];
        let event = classified("bash", json!({ "command": "git commit -m x" }));

        let annotation = check(&event, &[], &checklist, Phase::Implement, &config)
            .expect("commit with unverified P0 must block");
        assert_eq!(annotation.verdict, Verdict::Block);
    }

    #[test]
    fn flag_serialization_round_trip() {
        let flag = Flag::raise(FlagKind::Warning, Some("TASK-1".to_string()), "slow tests");
        let json = serde_json::to_string(&flag).unwrap();
        assert!(json.contains("\"WARNING\""));
        let restored: Flag = serde_json::from_str(&json).unwrap();
        assert_eq!(flag, restored);
    }
}
