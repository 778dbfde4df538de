// event.rs — ToolCallEvent: one attempted tool invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized tool-call event, produced once per invocation and consumed
/// by every gate. Immutable after classification; never persisted beyond
/// the single evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallEvent {
    /// The acting agent. `None` means the orchestrator itself is calling,
    /// which runs unrestricted by design.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,

    /// The tool being invoked (e.g., "read_file", "bash").
    pub tool_name: String,

    /// Structured tool parameters, as received from the host.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,

    /// When the call was attempted.
    pub timestamp: DateTime<Utc>,
}

impl ToolCallEvent {
    /// Build an event with the current timestamp.
    pub fn new(
        actor_id: Option<String>,
        tool_name: impl Into<String>,
        parameters: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            actor_id,
            tool_name: tool_name.into(),
            parameters,
            timestamp: Utc::now(),
        }
    }

    /// Build an event from an arbitrary host payload.
    ///
    /// This is deliberately tolerant: a payload that is not an object, or
    /// that lacks a tool name, produces an event with an empty tool name,
    /// which classifies as unscoped. Contract errors pass through with
    /// minimal checking rather than being rejected.
    pub fn from_value(raw: serde_json::Value) -> Self {
        let obj = raw.as_object().cloned().unwrap_or_default();
        let actor_id = obj
            .get("actor_id")
            .or_else(|| obj.get("agent_id"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let tool_name = obj
            .get("tool_name")
            .or_else(|| obj.get("tool"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let parameters = obj
            .get("parameters")
            .or_else(|| obj.get("tool_input"))
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        Self::new(actor_id, tool_name, parameters)
    }

    /// The first string parameter found under any of the given keys.
    pub fn str_param(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.parameters.get(*k))
            .and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_extracts_fields() {
        let event = ToolCallEvent::from_value(json!({
            "actor_id": "worker-1",
            "tool_name": "write_file",
            "parameters": { "file_path": "src/main.rs", "content": "fn main() {}" }
        }));
        assert_eq!(event.actor_id.as_deref(), Some("worker-1"));
        assert_eq!(event.tool_name, "write_file");
        assert_eq!(event.str_param(&["file_path"]), Some("src/main.rs"));
    }

    #[test]
    fn from_value_accepts_hook_style_keys() {
        // Hosts that emit `tool` / `tool_input` instead of the canonical keys.
        let event = ToolCallEvent::from_value(json!({
            "agent_id": "worker-2",
            "tool": "bash",
            "tool_input": { "command": "ls -la" }
        }));
        assert_eq!(event.actor_id.as_deref(), Some("worker-2"));
        assert_eq!(event.tool_name, "bash");
        assert_eq!(event.str_param(&["command"]), Some("ls -la"));
    }

    #[test]
    fn from_value_tolerates_garbage() {
        let event = ToolCallEvent::from_value(json!([1, 2, 3]));
        assert_eq!(event.tool_name, "");
        assert!(event.parameters.is_empty());
        assert!(event.actor_id.is_none());
    }

    #[test]
    fn missing_actor_means_unrestricted_caller() {
        let event = ToolCallEvent::from_value(json!({ "tool_name": "read_file" }));
        assert!(event.actor_id.is_none());
    }

    #[test]
    fn serialization_round_trip() {
        let event = ToolCallEvent::from_value(json!({
            "tool_name": "edit_file",
            "parameters": { "file_path": "a.rs" }
        }));
        let json = serde_json::to_string(&event).unwrap();
        let restored: ToolCallEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, restored);
    }
}
