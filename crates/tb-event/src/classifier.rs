// classifier.rs — Pure intent classification for tool-call events.
//
// Maps a tool name to a coarse intent and extracts the primary target
// path and shell command text. The table covers the common coding-agent
// tool vocabulary (both snake_case and the capitalized variants some
// hosts emit). Anything not in the table is unscoped: exempt from every
// gate except the pending-question lock.

use serde::{Deserialize, Serialize};

use crate::event::ToolCallEvent;

/// Coarse intent of a tool call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Pure read: file reads, listings, searches.
    Read,
    /// Creating a file or replacing its contents wholesale.
    Write,
    /// In-place modification of an existing file.
    Edit,
    /// Shell command execution.
    Execute,
    /// Spawning a sub-agent.
    SpawnAgent,
    /// Asking the human a question (or answering one).
    AskQuestion,
    /// Not classifiable; passes through with minimal checking.
    Unscoped,
}

impl Intent {
    /// Read-only intents are eligible for duplicate-call analysis and
    /// never imply a workflow phase on their own.
    pub fn is_read_only(self) -> bool {
        matches!(self, Intent::Read)
    }

    /// Intents that change the workspace (and therefore pass through the
    /// scope and flag gates).
    pub fn is_mutating(self) -> bool {
        matches!(self, Intent::Write | Intent::Edit | Intent::Execute)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Intent::Read => "read",
            Intent::Write => "write",
            Intent::Edit => "edit",
            Intent::Execute => "execute",
            Intent::SpawnAgent => "spawn_agent",
            Intent::AskQuestion => "ask_question",
            Intent::Unscoped => "unscoped",
        };
        write!(f, "{s}")
    }
}

/// A classified event: the raw event plus everything the gates need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    /// The underlying event.
    pub event: ToolCallEvent,
    /// Coarse intent tag.
    pub intent: Intent,
    /// Primary filesystem target, when the tool names one.
    pub target_path: Option<String>,
    /// Shell command text, for execute events.
    pub command: Option<String>,
}

/// Parameter keys that may carry the primary filesystem target.
const PATH_KEYS: &[&str] = &["file_path", "path", "target_file", "notebook_path"];

/// Classify a tool-call event. Pure and side-effect-free.
pub fn classify(event: ToolCallEvent) -> ClassifiedEvent {
    let intent = intent_for(&event.tool_name);
    let target_path = event.str_param(PATH_KEYS).map(str::to_string);
    let command = match intent {
        Intent::Execute => event.str_param(&["command"]).map(str::to_string),
        _ => None,
    };

    ClassifiedEvent {
        event,
        intent,
        target_path,
        command,
    }
}

/// The static tool-name → intent table.
fn intent_for(tool_name: &str) -> Intent {
    match tool_name.to_ascii_lowercase().as_str() {
        "read" | "read_file" | "glob" | "grep" | "ls" | "list_files" | "search"
        | "notebookread" => Intent::Read,
        "write" | "write_file" | "create_file" => Intent::Write,
        "edit" | "edit_file" | "multiedit" | "notebookedit" | "apply_patch" => Intent::Edit,
        "bash" | "shell" | "run_command" | "execute" => Intent::Execute,
        "task" | "agent" | "spawn_agent" | "dispatch_agent" => Intent::SpawnAgent,
        "ask_user" | "askuserquestion" | "ask_question" | "answer_question" => {
            Intent::AskQuestion
        }
        _ => Intent::Unscoped,
    }
}
