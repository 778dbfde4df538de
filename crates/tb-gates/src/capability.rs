// capability.rs — Capability grants and the capability boundary gate.
//
// Each event maps to exactly one required capability via a static table.
// An agent with no registry record runs in orchestrator mode and is
// unrestricted; this is deliberate (fail-open) so bootstrap flows cannot
// deadlock on their own gate. Unknown tools map to an always-granted
// pseudo-capability for the same reason.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tb_event::{ClassifiedEvent, Intent};
use tracing::debug;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::verdict::{Detail, GateAnnotation, Verdict};

/// Name of this gate in annotations.
pub const GATE: &str = "capability";

/// A named permission an agent may hold.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    FileRead,
    FileWrite,
    FileEdit,
    BashReadonly,
    BashExecute,
    CreateAgent,
    AskUser,
    /// Pseudo-capability for tools outside the mapping table; always
    /// granted so novel tools never fail closed.
    Unrestricted,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Capability::FileRead => "file_read",
            Capability::FileWrite => "file_write",
            Capability::FileEdit => "file_edit",
            Capability::BashReadonly => "bash_readonly",
            Capability::BashExecute => "bash_execute",
            Capability::CreateAgent => "create_agent",
            Capability::AskUser => "ask_user",
            Capability::Unrestricted => "unrestricted",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Capability {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file_read" => Ok(Capability::FileRead),
            "file_write" => Ok(Capability::FileWrite),
            "file_edit" => Ok(Capability::FileEdit),
            "bash_readonly" => Ok(Capability::BashReadonly),
            "bash_execute" => Ok(Capability::BashExecute),
            "create_agent" => Ok(Capability::CreateAgent),
            "ask_user" => Ok(Capability::AskUser),
            "unrestricted" => Ok(Capability::Unrestricted),
            other => Err(GateError::UnknownCapability(other.to_string())),
        }
    }
}

/// The set of capabilities granted to one agent.
///
/// Created when an agent registers; read-only to the gate. Absence of a
/// record means orchestrator mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityGrant {
    /// The agent this grant applies to.
    pub agent_id: String,
    /// The capabilities the agent holds.
    pub capabilities: BTreeSet<Capability>,
}

impl CapabilityGrant {
    /// Build a grant for an agent.
    pub fn new(agent_id: impl Into<String>, capabilities: BTreeSet<Capability>) -> Self {
        Self {
            agent_id: agent_id.into(),
            capabilities,
        }
    }

    /// Whether this grant satisfies a required capability.
    ///
    /// `bash_execute` subsumes `bash_readonly`: an agent allowed to run
    /// arbitrary commands is allowed to run read-only ones.
    pub fn satisfies(&self, required: Capability) -> bool {
        if self.capabilities.contains(&required) {
            return true;
        }
        required == Capability::BashReadonly
            && self.capabilities.contains(&Capability::BashExecute)
    }
}

/// Map an event to the one capability it requires.
pub fn required_capability(event: &ClassifiedEvent, config: &GateConfig) -> Capability {
    match event.intent {
        Intent::Read => Capability::FileRead,
        Intent::Write => Capability::FileWrite,
        Intent::Edit => Capability::FileEdit,
        Intent::Execute => {
            let command = event.command.as_deref().unwrap_or_default();
            if config.is_readonly_command(command) {
                Capability::BashReadonly
            } else {
                Capability::BashExecute
            }
        }
        Intent::SpawnAgent => Capability::CreateAgent,
        Intent::AskQuestion => Capability::AskUser,
        Intent::Unscoped => Capability::Unrestricted,
    }
}

/// The capability boundary gate.
///
/// `grant` is the acting agent's registry record, if one exists.
pub fn check(
    event: &ClassifiedEvent,
    grant: Option<&CapabilityGrant>,
    config: &GateConfig,
) -> Option<GateAnnotation> {
    let required = required_capability(event, config);

    if required == Capability::Unrestricted {
        debug!(tool = %event.event.tool_name, "unmapped tool, default-allowed");
        return None;
    }

    // No registry record: orchestrator mode, unrestricted.
    let grant = grant?;

    if grant.satisfies(required) {
        return None;
    }

    Some(
        GateAnnotation::new(
            GATE,
            Verdict::Block,
            format!(
                "agent '{}' lacks the '{required}' capability required by '{}'; \
                 grant it via the capability registry or route this action \
                 through the orchestrator",
                grant.agent_id, event.event.tool_name,
            ),
        )
        .with_detail(Detail::MissingCapability {
            required: required.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tb_event::{classify, ToolCallEvent};

    fn classified(tool: &str, params: serde_json::Value) -> ClassifiedEvent {
        classify(ToolCallEvent::from_value(
            json!({ "actor_id": "worker-1", "tool_name": tool, "parameters": params }),
        ))
    }

    fn grant(caps: &[Capability]) -> CapabilityGrant {
        CapabilityGrant::new("worker-1", caps.iter().copied().collect())
    }

    #[test]
    fn read_only_agent_blocked_from_writing() {
        let config = GateConfig::default();
        let event = classified("write_file", json!({ "file_path": "a.rs" }));
        let annotation = check(&event, Some(&grant(&[Capability::FileRead])), &config)
            .expect("write without file_write must block");

        assert_eq!(annotation.verdict, Verdict::Block);
        assert!(annotation.explanation.contains("file_write"));
        assert_eq!(
            annotation.detail,
            Some(Detail::MissingCapability {
                required: "file_write".to_string()
            })
        );
    }

    #[test]
    fn unregistered_agent_allowed_everything() {
        let config = GateConfig::default();
        let event = classified("write_file", json!({ "file_path": "a.rs" }));
        assert!(check(&event, None, &config).is_none());

        let event = classified("bash", json!({ "command": "rm -rf target" }));
        assert!(check(&event, None, &config).is_none());
    }

    #[test]
    fn granted_capability_allows() {
        let config = GateConfig::default();
        let event = classified("edit_file", json!({ "file_path": "a.rs" }));
        assert!(check(&event, Some(&grant(&[Capability::FileEdit])), &config).is_none());
    }

    #[test]
    fn readonly_command_needs_only_bash_readonly() {
        let config = GateConfig::default();
        let event = classified("bash", json!({ "command": "git status" }));
        assert_eq!(
            required_capability(&event, &config),
            Capability::BashReadonly
        );
        assert!(check(&event, Some(&grant(&[Capability::BashReadonly])), &config).is_none());
    }

    #[test]
    fn mutating_command_needs_bash_execute() {
        let config = GateConfig::default();
        let event = classified("bash", json!({ "command": "cargo build" }));
        assert_eq!(required_capability(&event, &config), Capability::BashExecute);

        let annotation = check(&event, Some(&grant(&[Capability::BashReadonly])), &config)
            .expect("mutating command without bash_execute must block");
        assert!(annotation.explanation.contains("bash_execute"));
    }

    #[test]
    fn bash_execute_subsumes_readonly() {
        let config = GateConfig::default();
        let event = classified("bash", json!({ "command": "ls" }));
        assert!(check(&event, Some(&grant(&[Capability::BashExecute])), &config).is_none());
    }

    #[test]
    fn unknown_tool_default_allowed_even_with_grant() {
        let config = GateConfig::default();
        let event = classified("mystery_tool", json!({}));
        assert!(check(&event, Some(&grant(&[])), &config).is_none());
    }

    #[test]
    fn spawn_agent_requires_create_agent() {
        let config = GateConfig::default();
        let event = classified("task", json!({}));
        let annotation = check(&event, Some(&grant(&[Capability::FileRead])), &config)
            .expect("spawn without create_agent must block");
        assert!(annotation.explanation.contains("create_agent"));
    }

    #[test]
    fn capability_parse_display_round_trip() {
        for cap in [
            Capability::FileRead,
            Capability::FileWrite,
            Capability::FileEdit,
            Capability::BashReadonly,
            Capability::BashExecute,
            Capability::CreateAgent,
            Capability::AskUser,
        ] {
            let parsed: Capability = cap.to_string().parse().unwrap();
            assert_eq!(parsed, cap);
        }
        assert!("fly".parse::<Capability>().is_err());
    }

    #[test]
    fn grant_serialization_round_trip() {
        let g = grant(&[Capability::FileRead, Capability::BashReadonly]);
        let json = serde_json::to_string(&g).unwrap();
        let restored: CapabilityGrant = serde_json::from_str(&json).unwrap();
        assert_eq!(g, restored);
    }
}
