// check.rs — Evaluate one tool-call event.
//
// The host's pre-tool-call hook pipes the event JSON to stdin (or names
// a file) and consumes the exit code: 0 = proceed (ALLOW or WARN),
// 2 = blocked. The full structured response goes to stdout either way.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tb_dispatch::{EngineConfig, OverrideContext};
use tb_gates::Verdict;

use super::open_engine;

/// Exit code signaled to the host when the verdict is BLOCK.
const BLOCK_EXIT_CODE: i32 = 2;

#[derive(Args)]
pub struct CheckArgs {
    /// Read the event from this file instead of stdin.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Acting agent id; overrides any actor_id in the payload.
    #[arg(long)]
    actor: Option<String>,

    /// Force ALLOW past the workflow phase gate (recorded in the audit trail).
    #[arg(long)]
    override_phase: bool,

    /// Force ALLOW past the task scope gate (recorded in the audit trail).
    #[arg(long)]
    override_scope: bool,
}

pub fn execute(args: &CheckArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let raw = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read event from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read event from stdin")?;
            buf
        }
    };

    // A payload that is not JSON still gets evaluated: it classifies as
    // unscoped and passes through with minimal checking.
    let mut payload: serde_json::Value =
        serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null);
    if let Some(actor) = &args.actor {
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("actor_id".to_string(), serde_json::json!(actor));
        }
    }

    let overrides = OverrideContext {
        phase: args.override_phase,
        scope: args.override_scope,
    };

    let engine = open_engine(config)?;
    let response = engine.evaluate(payload, &overrides);

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.verdict == Verdict::Block {
        std::process::exit(BLOCK_EXIT_CODE);
    }
    Ok(())
}
