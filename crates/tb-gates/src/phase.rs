// phase.rs — Workflow phase state machine and the phase gate.
//
// Phases run forward: init → research → planning → implement → review →
// complete. Rework loops (backward moves) are always legal; forward moves
// are legal only to the adjacent phase or through the configured skip
// allow-list. The gate only checks; PhaseState is mutated exclusively by
// an explicit, validated `transition` (driven by the CLI or the host).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_event::{ClassifiedEvent, Intent};

use crate::config::GateConfig;
use crate::error::GateError;
use crate::verdict::{Detail, GateAnnotation, Verdict};

/// Name of this gate in annotations.
pub const GATE: &str = "workflow_phase";

/// A development workflow phase, in forward order.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Research,
    Planning,
    Implement,
    Review,
    Complete,
}

/// All phases in forward order. Ordinal = index.
pub const PHASE_ORDER: [Phase; 6] = [
    Phase::Init,
    Phase::Research,
    Phase::Planning,
    Phase::Implement,
    Phase::Review,
    Phase::Complete,
];

impl Phase {
    /// Position in the forward ordering.
    pub fn ordinal(self) -> usize {
        PHASE_ORDER.iter().position(|p| *p == self).unwrap_or(0)
    }

    /// The phases strictly between `self` and a later phase `to`.
    pub fn missing_between(self, to: Phase) -> Vec<Phase> {
        let (a, b) = (self.ordinal(), to.ordinal());
        if b <= a + 1 {
            return Vec::new();
        }
        PHASE_ORDER[a + 1..b].to_vec()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::Research => "research",
            Phase::Planning => "planning",
            Phase::Implement => "implement",
            Phase::Review => "review",
            Phase::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Phase {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Phase::Init),
            "research" => Ok(Phase::Research),
            "planning" => Ok(Phase::Planning),
            "implement" => Ok(Phase::Implement),
            "review" => Ok(Phase::Review),
            "complete" => Ok(Phase::Complete),
            other => Err(GateError::UnknownPhase(other.to_string())),
        }
    }
}

/// One entry in the phase history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseEntry {
    pub phase: Phase,
    pub entered_at: DateTime<Utc>,
}

/// The workflow session's phase state. Exactly one is current per session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseState {
    /// The phase the session is currently in.
    pub current: Phase,
    /// Every phase entered so far, in order.
    pub history: Vec<PhaseEntry>,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseState {
    /// A fresh session starts in `init`.
    pub fn new() -> Self {
        Self {
            current: Phase::Init,
            history: vec![PhaseEntry {
                phase: Phase::Init,
                entered_at: Utc::now(),
            }],
        }
    }

    /// Perform a validated transition, appending to history.
    ///
    /// This is the only way phase state changes; the gate never calls it.
    pub fn transition(&mut self, to: Phase, config: &GateConfig) -> Result<(), GateError> {
        if let Blocked { missing } = transition_check(self.current, to, config) {
            return Err(GateError::InvalidPhaseTransition {
                from: self.current.to_string(),
                to: to.to_string(),
                missing: missing.iter().map(|p| p.to_string()).collect(),
            });
        }
        self.current = to;
        self.history.push(PhaseEntry {
            phase: to,
            entered_at: Utc::now(),
        });
        Ok(())
    }
}

/// Result of checking a phase move against the transition rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionCheck {
    Allowed,
    Blocked { missing: Vec<Phase> },
}
use TransitionCheck::{Allowed, Blocked};

/// Transition rules: same or backward is always allowed (rework loops),
/// forward is allowed only when adjacent or explicitly allow-listed.
pub fn transition_check(from: Phase, to: Phase, config: &GateConfig) -> TransitionCheck {
    if to.ordinal() <= from.ordinal() + 1 {
        return Allowed;
    }
    if config
        .allowed_phase_skips
        .iter()
        .any(|s| s.from == from && s.to == to)
    {
        return Allowed;
    }
    Blocked {
        missing: from.missing_between(to),
    }
}

/// Tools that imply the research phase regardless of intent.
const RESEARCH_TOOLS: &[&str] = &["web_search", "web_fetch", "fetch_url", "search_docs"];

/// Which phase an event implies, or `None` for "any".
///
/// Pure reads and tools outside the mapping imply no phase and are always
/// allowed. Read-only shell commands likewise imply nothing.
pub fn implied_phase(event: &ClassifiedEvent, config: &GateConfig) -> Option<Phase> {
    let tool = event.event.tool_name.to_ascii_lowercase();
    if config.is_completion_tool(&tool) || event.command.as_deref().is_some_and(is_commit_command)
    {
        return Some(Phase::Complete);
    }
    if RESEARCH_TOOLS.contains(&tool.as_str()) {
        return Some(Phase::Research);
    }
    match event.intent {
        Intent::Write | Intent::Edit => Some(Phase::Implement),
        Intent::Execute => {
            let command = event.command.as_deref().unwrap_or_default();
            if config.is_readonly_command(command) {
                None
            } else {
                Some(Phase::Implement)
            }
        }
        _ => None,
    }
}

/// Whether a shell command is a commit (a completion-signaling event).
pub fn is_commit_command(command: &str) -> bool {
    command
        .split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .any(|w| w == ["git", "commit"])
}

/// The phase gate: validate the event's implied phase against the current
/// phase. Returns `None` when the event implies no phase or the move is
/// legal; a BLOCK annotation otherwise.
pub fn check(
    event: &ClassifiedEvent,
    phase_state: &PhaseState,
    config: &GateConfig,
) -> Option<GateAnnotation> {
    let implied = implied_phase(event, config)?;
    match transition_check(phase_state.current, implied, config) {
        Allowed => None,
        Blocked { missing } => {
            let missing_names: Vec<String> = missing.iter().map(|p| p.to_string()).collect();
            let suggested = missing
                .first()
                .map(|p| format!("enter the {p} phase next"))
                .unwrap_or_else(|| "advance one phase at a time".to_string());
            Some(
                GateAnnotation::new(
                    GATE,
                    Verdict::Block,
                    format!(
                        "'{}' implies the {} phase, but the session is in {}; \
                         required phase(s) not yet entered: {}. Suggested next action: {}.",
                        event.event.tool_name,
                        implied,
                        phase_state.current,
                        missing_names.join(", "),
                        suggested,
                    ),
                )
                .with_detail(Detail::PhaseJump {
                    from: phase_state.current.to_string(),
                    to: implied.to_string(),
                    missing: missing_names,
                    suggested_next: suggested,
                }),
            )
        }
    }
}
