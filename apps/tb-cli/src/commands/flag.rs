// flag.rs — Flag subcommands: raise, resolve, list.

use clap::Subcommand;
use tb_dispatch::EngineConfig;
use tb_gates::{FlagKind, FlagStatus};
use uuid::Uuid;

use super::open_engine;

#[derive(Subcommand)]
pub enum FlagCommands {
    /// Raise a flag.
    Raise {
        /// Flag kind: blocker, warning, or info.
        kind: String,
        /// What the flag is about.
        message: String,
        /// Task this flag concerns.
        #[arg(long)]
        task: Option<String>,
    },
    /// Resolve a flag by id.
    Resolve {
        /// The flag's id.
        id: Uuid,
    },
    /// List flags.
    List {
        /// Include resolved flags too.
        #[arg(long)]
        all: bool,
    },
}

fn parse_kind(s: &str) -> anyhow::Result<FlagKind> {
    match s.to_ascii_lowercase().as_str() {
        "blocker" => Ok(FlagKind::Blocker),
        "warning" => Ok(FlagKind::Warning),
        "info" => Ok(FlagKind::Info),
        other => anyhow::bail!("unknown flag kind '{other}' (expected blocker, warning, or info)"),
    }
}

pub fn execute(cmd: &FlagCommands, config: &EngineConfig) -> anyhow::Result<()> {
    let engine = open_engine(config)?;

    match cmd {
        FlagCommands::Raise { kind, message, task } => {
            let flag = engine.raise_flag(parse_kind(kind)?, task.clone(), message)?;
            println!("Flag {} raised ({:?}).", flag.id, flag.kind);
        }

        FlagCommands::Resolve { id } => {
            let flag = engine.resolve_flag(*id)?;
            println!("Flag {} resolved: {}", flag.id, flag.message);
        }

        FlagCommands::List { all } => {
            let flags = engine.flags();
            let visible: Vec<_> = flags
                .iter()
                .filter(|f| *all || f.status == FlagStatus::Active)
                .collect();

            if visible.is_empty() {
                println!("No flags.");
                return Ok(());
            }
            for flag in visible {
                println!(
                    "{}  {:<8}  {:<9}  {}",
                    flag.id,
                    format!("{:?}", flag.kind).to_uppercase(),
                    format!("{:?}", flag.status).to_lowercase(),
                    flag.message
                );
            }
        }
    }

    Ok(())
}
