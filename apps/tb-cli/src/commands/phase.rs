// phase.rs — Workflow phase subcommands: set, show.

use clap::Subcommand;
use tb_dispatch::EngineConfig;
use tb_gates::Phase;

use super::open_engine;

#[derive(Subcommand)]
pub enum PhaseCommands {
    /// Transition to a phase (validated against the transition rules).
    Set {
        /// Target phase: init, research, planning, implement, review, complete.
        phase: String,
    },
    /// Show the current phase and its history.
    Show,
}

pub fn execute(cmd: &PhaseCommands, config: &EngineConfig) -> anyhow::Result<()> {
    let engine = open_engine(config)?;

    match cmd {
        PhaseCommands::Set { phase } => {
            let to: Phase = phase.parse()?;
            let state = engine.set_phase(to)?;
            println!("Phase is now '{}'.", state.current);
        }

        PhaseCommands::Show => {
            let state = engine.current_phase();
            println!("Current phase: {}", state.current);
            println!("History:");
            for entry in &state.history {
                println!(
                    "  {} entered {}",
                    entry.phase,
                    entry.entered_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }

    Ok(())
}
