//! # tb-cli
//!
//! Command-line interface for Tollbooth.
//!
//! The host wires `tollbooth check` into its pre-tool-call hook: the
//! event arrives as JSON on stdin, the response comes back as JSON on
//! stdout, and the exit code is the pass/fail signal (0 = proceed,
//! 2 = blocked). The remaining subcommands maintain the state the gates
//! read:
//! - `tollbooth task start/finish/show` — task scope boundaries
//! - `tollbooth phase set/show` — validated workflow transitions
//! - `tollbooth flag raise/resolve/list` — blocker/warning flags
//! - `tollbooth checklist add/verify/list` — completion checklists
//! - `tollbooth question ask/answer/show` — the mandatory-question lock
//! - `tollbooth grant set/show/clear` — capability registry
//! - `tollbooth audit verify/tail` — the tamper-evident decision log

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tb_dispatch::EngineConfig;

/// Tollbooth CLI — admission control for agent tool calls.
#[derive(Parser)]
#[command(name = "tollbooth", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one tool-call event and print the verdict.
    Check(commands::check::CheckArgs),
    /// Manage the current task scope.
    Task {
        #[command(subcommand)]
        command: commands::task::TaskCommands,
    },
    /// View or transition the workflow phase.
    Phase {
        #[command(subcommand)]
        command: commands::phase::PhaseCommands,
    },
    /// Raise, resolve, and list flags.
    Flag {
        #[command(subcommand)]
        command: commands::flag::FlagCommands,
    },
    /// Manage completion checklists.
    Checklist {
        #[command(subcommand)]
        command: commands::checklist::ChecklistCommands,
    },
    /// Manage the pending mandatory question.
    Question {
        #[command(subcommand)]
        command: commands::question::QuestionCommands,
    },
    /// Manage capability grants.
    Grant {
        #[command(subcommand)]
        command: commands::grant::GrantCommands,
    },
    /// Inspect the decision log.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = EngineConfig::for_project(&project_root);

    match &cli.command {
        Commands::Check(args) => commands::check::execute(args, &config),
        Commands::Task { command } => commands::task::execute(command, &config),
        Commands::Phase { command } => commands::phase::execute(command, &config),
        Commands::Flag { command } => commands::flag::execute(command, &config),
        Commands::Checklist { command } => commands::checklist::execute(command, &config),
        Commands::Question { command } => commands::question::execute(command, &config),
        Commands::Grant { command } => commands::grant::execute(command, &config),
        Commands::Audit { command } => commands::audit::execute(command, &config),
    }
}
