// scope.rs — Task scope: declared boundaries and the scope gate.
//
// A task declares which paths it may touch and which command shapes it
// may run. Write/edit targets are matched as globs (literal separators,
// so `src/*` does not reach into subdirectories); commands are matched
// against regex patterns. Invalid patterns never match (fail-closed).
//
// With no current task there is nothing declared to violate, so the gate
// allows; the capability and phase gates still apply.

use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tb_event::{ClassifiedEvent, Intent};
use tracing::warn;

use crate::config::GateConfig;
use crate::verdict::{Detail, GateAnnotation, Verdict};

/// Name of this gate in annotations.
pub const GATE: &str = "task_scope";

/// A file touched by an allowed write/edit, with when it happened.
/// Consumed by duplicate-call analysis to recognize verification reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModifiedFile {
    pub path: String,
    pub modified_at: DateTime<Utc>,
}

/// The current task's declared boundaries.
///
/// Created when a task begins, appended to as files are touched,
/// destroyed when the task completes or is abandoned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskScope {
    /// Identifier of the task that declared this scope.
    pub task_id: String,
    /// Glob patterns for paths the task may write or edit.
    pub allowed_paths: Vec<String>,
    /// Regex patterns for commands the task may run.
    pub allowed_command_patterns: Vec<String>,
    /// Files touched so far, in order.
    #[serde(default)]
    pub modified_files: Vec<ModifiedFile>,
    /// When the task began.
    pub started_at: DateTime<Utc>,
}

impl TaskScope {
    /// Declare a new scope for a task.
    pub fn new(
        task_id: impl Into<String>,
        allowed_paths: Vec<String>,
        allowed_command_patterns: Vec<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            allowed_paths,
            allowed_command_patterns,
            modified_files: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Whether a path falls inside the declared boundaries.
    pub fn allows_path(&self, path: &str) -> bool {
        let path = path.strip_prefix("./").unwrap_or(path);
        let opts = MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };
        self.allowed_paths.iter().any(|p| match Pattern::new(p) {
            Ok(pattern) => pattern.matches_with(path, opts),
            Err(err) => {
                warn!(pattern = %p, %err, "invalid scope path pattern, never matches");
                false
            }
        })
    }

    /// Whether a command matches a declared pattern.
    pub fn allows_command(&self, command: &str) -> bool {
        self.allowed_command_patterns
            .iter()
            .any(|p| match Regex::new(p) {
                Ok(re) => re.is_match(command),
                Err(err) => {
                    warn!(pattern = %p, %err, "invalid scope command pattern, never matches");
                    false
                }
            })
    }

    /// Record an allowed write/edit target. Called by the dispatcher
    /// after the merged verdict permits the event, never by the gate.
    pub fn record_modified(&mut self, path: impl Into<String>) {
        self.modified_files.push(ModifiedFile {
            path: path.into(),
            modified_at: Utc::now(),
        });
    }
}

/// Remedies offered with every out-of-scope path block.
fn path_remedies(task_id: &str) -> Vec<String> {
    vec![
        "expand the task scope to include this path".to_string(),
        format!("finish task '{task_id}' before touching files outside it"),
        "re-run with an explicit scope override acknowledgement".to_string(),
    ]
}

/// The task scope gate.
pub fn check(
    event: &ClassifiedEvent,
    task: Option<&TaskScope>,
    config: &GateConfig,
) -> Option<GateAnnotation> {
    let task = task?;

    match event.intent {
        Intent::Write | Intent::Edit => {
            let path = event.target_path.as_deref()?;
            if task.allows_path(path) {
                return None;
            }
            let remedies = path_remedies(&task.task_id);
            Some(
                GateAnnotation::new(
                    GATE,
                    Verdict::Block,
                    format!(
                        "path '{path}' is outside the declared scope of task '{}' \
                         (allowed: {}); remedies: {}",
                        task.task_id,
                        task.allowed_paths.join(", "),
                        remedies.join("; "),
                    ),
                )
                .with_detail(Detail::PathOutOfScope {
                    path: path.to_string(),
                    allowed: task.allowed_paths.clone(),
                    remedies,
                }),
            )
        }
        Intent::Execute => {
            let command = event.command.as_deref()?;
            // Read-only commands cannot violate a write boundary.
            if config.is_readonly_command(command) || task.allows_command(command) {
                return None;
            }
            let suggestion =
                "decompose the command into steps that match the task's declared patterns"
                    .to_string();
            Some(
                GateAnnotation::new(
                    GATE,
                    Verdict::Block,
                    format!(
                        "command '{command}' does not match any declared pattern for \
                         task '{}'; {suggestion}",
                        task.task_id,
                    ),
                )
                .with_detail(Detail::CommandOutOfScope {
                    command: command.to_string(),
                    suggestion,
                }),
            )
        }
        _ => None,
    }
}
