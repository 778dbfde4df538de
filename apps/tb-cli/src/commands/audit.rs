// audit.rs — Decision log subcommands: verify, tail, waste.

use clap::Subcommand;
use tb_audit::DecisionLog;
use tb_dispatch::EngineConfig;

use super::open_engine;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the decision log hash chain.
    Verify,
    /// Show recent decisions.
    Tail {
        /// Number of records to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
    /// Show the session waste estimate from duplicate-call analysis.
    Waste,
}

pub fn execute(cmd: &AuditCommands, config: &EngineConfig) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify => {
            let path = &config.decision_log;
            if !path.exists() {
                println!("No decision log found at {}", path.display());
                return Ok(());
            }

            match DecisionLog::verify_chain(path) {
                Ok(_) => {
                    let records = DecisionLog::read_all(path)?;
                    println!(
                        "Decision log verified: {} record(s), hash chain intact.",
                        records.len()
                    );
                }
                Err(tb_audit::AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {line}:");
                    println!("  Expected previous_hash: {expected}");
                    println!("  Actual previous_hash:   {actual}");
                    anyhow::bail!("decision log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { n } => {
            let path = &config.decision_log;
            if !path.exists() {
                println!("No decision log found at {}", path.display());
                return Ok(());
            }

            let records = DecisionLog::tail(path, *n)?;
            if records.is_empty() {
                println!("No decisions recorded.");
                return Ok(());
            }

            println!("{:<20} {:<12} {:<18} {:<7} GATES", "TIMESTAMP", "ACTOR", "TOOL", "VERDICT");
            println!("{}", "-".repeat(80));
            for record in records {
                let gates: Vec<String> = record
                    .annotations
                    .iter()
                    .map(|a| format!("{}={}", a.gate, a.verdict))
                    .collect();
                println!(
                    "{:<20} {:<12} {:<18} {:<7} {}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.actor_id.as_deref().unwrap_or("-"),
                    record.tool_name,
                    record.verdict.to_string(),
                    if gates.is_empty() { "-".to_string() } else { gates.join(" ") },
                );
            }
        }

        AuditCommands::Waste => {
            let engine = open_engine(config)?;
            println!("Estimated session waste: ~{} tokens", engine.session_waste());
        }
    }

    Ok(())
}
