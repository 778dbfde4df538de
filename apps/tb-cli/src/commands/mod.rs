// mod.rs — CLI subcommand modules.

pub mod audit;
pub mod check;
pub mod checklist;
pub mod flag;
pub mod grant;
pub mod phase;
pub mod question;
pub mod task;

use tb_dispatch::{Dispatcher, EngineConfig};
use tb_state::JsonFileStore;

/// Open the engine for an admin subcommand.
pub fn open_engine(config: &EngineConfig) -> anyhow::Result<Dispatcher<JsonFileStore>> {
    Ok(Dispatcher::open(config)?)
}
