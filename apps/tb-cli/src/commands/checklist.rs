// checklist.rs — Checklist subcommands: add, verify, list.

use clap::Subcommand;
use tb_dispatch::EngineConfig;
use tb_gates::{Phase, Priority};
use uuid::Uuid;

use super::open_engine;

#[derive(Subcommand)]
pub enum ChecklistCommands {
    /// Add a checklist item for a phase.
    Add {
        /// Phase the item belongs to.
        phase: String,
        /// Priority: p0 (blocks completion) or p1 (warns only).
        priority: String,
        /// What must be done.
        description: String,
    },
    /// Mark an item verified.
    Verify {
        /// The item's id.
        id: Uuid,
    },
    /// List checklist items.
    List,
}

fn parse_priority(s: &str) -> anyhow::Result<Priority> {
    match s.to_ascii_lowercase().as_str() {
        "p0" => Ok(Priority::P0),
        "p1" => Ok(Priority::P1),
        other => anyhow::bail!("unknown priority '{other}' (expected p0 or p1)"),
    }
}

pub fn execute(cmd: &ChecklistCommands, config: &EngineConfig) -> anyhow::Result<()> {
    let engine = open_engine(config)?;

    match cmd {
        ChecklistCommands::Add {
            phase,
            priority,
            description,
        } => {
            let phase: Phase = phase.parse()?;
            let item = engine.add_checklist_item(phase, parse_priority(priority)?, description)?;
            println!("Checklist item {} added for the {} phase.", item.id, phase);
        }

        ChecklistCommands::Verify { id } => {
            let item = engine.verify_checklist_item(*id)?;
            println!("Verified: {}", item.description);
        }

        ChecklistCommands::List => {
            let items = engine.checklist();
            if items.is_empty() {
                println!("No checklist items.");
                return Ok(());
            }
            for item in items {
                println!(
                    "{}  {:<9}  {:?}  [{}]  {}",
                    item.id,
                    item.phase.to_string(),
                    item.priority,
                    if item.verified { "x" } else { " " },
                    item.description
                );
            }
        }
    }

    Ok(())
}
