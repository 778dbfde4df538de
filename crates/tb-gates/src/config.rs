// config.rs — Externally configurable thresholds and pattern sets.
//
// Every knob the gates consult lives here so deployments can tune
// behavior without code changes. Unset fields fall back to defaults, so a
// partial config file is fine.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::phase::Phase;

/// One allow-listed forward phase skip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseSkip {
    pub from: Phase,
    pub to: Phase,
}

/// Gate configuration. Deserialized from `.tollbooth/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Active WARNING flags beyond this count produce a WARN verdict.
    pub warning_flag_threshold: usize,

    /// A repeated read older than this is a deliberate context refresh,
    /// not waste.
    pub staleness_seconds: u64,

    /// TTL on call-history entries; bounds the duplicate-detection window
    /// to the working session.
    pub call_history_ttl_seconds: u64,

    /// Fallback waste estimate for tools not in the table.
    pub default_waste_estimate: u64,

    /// Regex patterns recognizing read-only shell commands. Every segment
    /// of a compound command must match one for the command to count as
    /// read-only.
    pub readonly_commands: Vec<String>,

    /// Tool names that signal task completion (checklist enforcement).
    pub completion_tools: Vec<String>,

    /// Estimated cost (tokens) of a wasteful repeat, keyed by tool name.
    pub waste_estimates: BTreeMap<String, u64>,

    /// Forward phase skips that are explicitly legal.
    pub allowed_phase_skips: Vec<PhaseSkip>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            warning_flag_threshold: 3,
            staleness_seconds: 120,
            call_history_ttl_seconds: 3600,
            default_waste_estimate: 500,
            readonly_commands: [
                r"^ls(\s|$)",
                r"^cat\s",
                r"^head(\s|$)",
                r"^tail(\s|$)",
                r"^grep\s",
                r"^rg\s",
                r"^find\s",
                r"^pwd$",
                r"^echo(\s|$)",
                r"^wc(\s|$)",
                r"^which\s",
                r"^git\s+(status|log|diff|show|branch)(\s|$)",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            completion_tools: ["mark_complete", "task_done", "complete_task"]
                .into_iter()
                .map(String::from)
                .collect(),
            waste_estimates: BTreeMap::from([
                ("read_file".to_string(), 800),
                ("grep".to_string(), 400),
                ("glob".to_string(), 200),
                ("ls".to_string(), 150),
            ]),
            allowed_phase_skips: vec![
                // Trivial tasks that need no research phase.
                PhaseSkip {
                    from: Phase::Init,
                    to: Phase::Planning,
                },
                // Well-understood changes that need no separate plan.
                PhaseSkip {
                    from: Phase::Research,
                    to: Phase::Implement,
                },
            ],
        }
    }
}

impl GateConfig {
    /// Whether every segment of `command` matches a read-only pattern.
    ///
    /// Compound commands are split on shell connectors first, so
    /// `git status && rm -rf target` is NOT read-only.
    pub fn is_readonly_command(&self, command: &str) -> bool {
        let command = command.trim();
        if command.is_empty() {
            return false;
        }
        segments(command).iter().all(|segment| {
            self.readonly_commands.iter().any(|pattern| {
                match Regex::new(pattern) {
                    Ok(re) => re.is_match(segment),
                    Err(err) => {
                        warn!(%pattern, %err, "invalid readonly command pattern, skipping");
                        false
                    }
                }
            })
        })
    }

    /// Whether a tool name signals task completion.
    pub fn is_completion_tool(&self, tool: &str) -> bool {
        self.completion_tools.iter().any(|t| t == tool)
    }

    /// The per-repeat waste estimate for a tool.
    pub fn waste_estimate_for(&self, tool: &str) -> u64 {
        self.waste_estimates
            .get(&tool.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.default_waste_estimate)
    }
}

/// Split a compound shell command into its simple segments.
fn segments(command: &str) -> Vec<&str> {
    command
        .split("&&")
        .flat_map(|s| s.split("||"))
        .flat_map(|s| s.split(';'))
        .flat_map(|s| s.split('|'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_readonly_commands_recognized() {
        let config = GateConfig::default();
        assert!(config.is_readonly_command("ls -la"));
        assert!(config.is_readonly_command("git status"));
        assert!(config.is_readonly_command("git log --oneline"));
        assert!(config.is_readonly_command("grep -r TODO src"));
    }

    #[test]
    fn mutating_commands_not_readonly() {
        let config = GateConfig::default();
        assert!(!config.is_readonly_command("rm -rf target"));
        assert!(!config.is_readonly_command("cargo build"));
        assert!(!config.is_readonly_command("git push origin main"));
    }

    #[test]
    fn compound_command_is_readonly_only_if_all_segments_are() {
        let config = GateConfig::default();
        assert!(config.is_readonly_command("git status && git log"));
        assert!(config.is_readonly_command("cat a.txt | grep x"));
        assert!(!config.is_readonly_command("git status && rm -rf target"));
        assert!(!config.is_readonly_command("ls; cargo build"));
    }

    #[test]
    fn empty_command_not_readonly() {
        let config = GateConfig::default();
        assert!(!config.is_readonly_command(""));
        assert!(!config.is_readonly_command("   "));
    }

    #[test]
    fn waste_estimate_falls_back_to_default() {
        let config = GateConfig::default();
        assert_eq!(config.waste_estimate_for("read_file"), 800);
        assert_eq!(config.waste_estimate_for("unknown_tool"), 500);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: GateConfig = toml::from_str("warning_flag_threshold = 5").unwrap();
        assert_eq!(config.warning_flag_threshold, 5);
        assert_eq!(config.staleness_seconds, 120);
        assert!(!config.readonly_commands.is_empty());
    }

    #[test]
    fn phase_skips_serialize_by_name() {
        let config = GateConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("init"));
        assert!(toml.contains("planning"));
    }
}
