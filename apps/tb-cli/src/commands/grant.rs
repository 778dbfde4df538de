// grant.rs — Capability registry subcommands: set, show, clear.

use std::collections::BTreeSet;

use clap::Subcommand;
use tb_dispatch::EngineConfig;
use tb_gates::Capability;

use super::open_engine;

#[derive(Subcommand)]
pub enum GrantCommands {
    /// Register (or replace) an agent's capability set.
    Set {
        /// The agent id.
        agent_id: String,
        /// Capabilities to grant (repeatable): file_read, file_write,
        /// file_edit, bash_readonly, bash_execute, create_agent, ask_user.
        #[arg(long = "cap", required = true)]
        capabilities: Vec<String>,
    },
    /// Show an agent's grant.
    Show {
        /// The agent id.
        agent_id: String,
    },
    /// Remove an agent's grant (back to unrestricted orchestrator mode).
    Clear {
        /// The agent id.
        agent_id: String,
    },
}

pub fn execute(cmd: &GrantCommands, config: &EngineConfig) -> anyhow::Result<()> {
    let engine = open_engine(config)?;

    match cmd {
        GrantCommands::Set {
            agent_id,
            capabilities,
        } => {
            let caps: BTreeSet<Capability> = capabilities
                .iter()
                .map(|c| c.parse())
                .collect::<Result<_, _>>()?;
            let grant = engine.set_grant(agent_id, caps)?;
            println!(
                "Agent '{}' granted: {}",
                grant.agent_id,
                grant
                    .capabilities
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        GrantCommands::Show { agent_id } => match engine.grant_for(agent_id) {
            Some(grant) => {
                for cap in &grant.capabilities {
                    println!("{cap}");
                }
            }
            None => println!("No grant for '{agent_id}' (orchestrator mode: unrestricted)."),
        },

        GrantCommands::Clear { agent_id } => {
            engine.clear_grant(agent_id)?;
            println!("Grant for '{agent_id}' cleared.");
        }
    }

    Ok(())
}
