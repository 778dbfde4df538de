//! # tb-dispatch
//!
//! The Tollbooth dispatcher: one synchronous evaluation per tool call.
//!
//! The pipeline runs the pending-question lock first (it dominates and
//! short-circuits), then the independent capability, phase, scope, and
//! flag gates, merges their verdicts (BLOCK > WARN > ALLOW, carrying
//! every blocking explanation), and finishes with the advisory
//! duplicate-call annotation. Side effects (call history, modified-file
//! recording, violation counters) are applied here, through the state
//! store only; the gates themselves stay pure.
//!
//! Overrides arrive as an explicit [`OverrideContext`], never an ambient
//! environment variable, and their use is always recorded in the response
//! and the decision log.

pub mod admin;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod overrides;
pub mod response;

pub use config::EngineConfig;
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use overrides::OverrideContext;
pub use response::GateResponse;
