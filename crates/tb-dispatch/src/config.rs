// config.rs — Engine file layout and gate-config loading.
//
// EngineConfig determines where the engine keeps its state: the
// namespaced state directory, the decision log, and the optional gate
// config file. The `for_project()` constructor generates the standard
// layout under a `.tollbooth/` directory in the project root.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tb_gates::GateConfig;
use tracing::warn;

/// Where one project's engine state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory of the project being gated.
    pub project_root: PathBuf,

    /// Directory holding one JSON document per state namespace.
    pub state_dir: PathBuf,

    /// Path to the append-only decision log.
    pub decision_log: PathBuf,

    /// Path to the gate configuration file (thresholds, pattern sets).
    pub config_file: PathBuf,
}

impl EngineConfig {
    /// Standard `.tollbooth/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let tollbooth_dir = root.join(".tollbooth");
        Self {
            project_root: root,
            state_dir: tollbooth_dir.join("state"),
            decision_log: tollbooth_dir.join("decisions.jsonl"),
            config_file: tollbooth_dir.join("config.toml"),
        }
    }

    /// Load the gate config, falling back to defaults.
    ///
    /// A missing file is the normal case. A corrupt file is a
    /// configuration error: logged, then defaults are used, because a
    /// broken config must not wedge the host.
    pub fn load_gate_config(&self) -> GateConfig {
        match fs::read_to_string(&self.config_file) {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    warn!(
                        path = %self.config_file.display(),
                        %err,
                        "invalid gate config, using defaults"
                    );
                    GateConfig::default()
                }
            },
            Err(_) => GateConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn for_project_uses_tollbooth_dir() {
        let config = EngineConfig::for_project("/work/repo");
        assert_eq!(config.state_dir, PathBuf::from("/work/repo/.tollbooth/state"));
        assert_eq!(
            config.decision_log,
            PathBuf::from("/work/repo/.tollbooth/decisions.jsonl")
        );
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::for_project(dir.path());
        let gates = config.load_gate_config();
        assert_eq!(gates.warning_flag_threshold, 3);
    }

    #[test]
    fn config_file_overrides_thresholds() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::for_project(dir.path());
        fs::create_dir_all(config.config_file.parent().unwrap()).unwrap();
        fs::write(
            &config.config_file,
            "warning_flag_threshold = 7\nstaleness_seconds = 60\n",
        )
        .unwrap();

        let gates = config.load_gate_config();
        assert_eq!(gates.warning_flag_threshold, 7);
        assert_eq!(gates.staleness_seconds, 60);
    }

    #[test]
    fn corrupt_config_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::for_project(dir.path());
        fs::create_dir_all(config.config_file.parent().unwrap()).unwrap();
        fs::write(&config.config_file, "warning_flag_threshold = \"lots\"").unwrap();

        let gates = config.load_gate_config();
        assert_eq!(gates.warning_flag_threshold, 3);
    }
}
