//! # tb-gates
//!
//! The policy gates of the Tollbooth admission-control engine.
//!
//! Each gate is a pure function from `(classified event, relevant state,
//! config)` to an optional [`GateAnnotation`]; nothing in this crate
//! touches storage. The dispatcher (in `tb-dispatch`) snapshots state,
//! runs the gates, merges verdicts, and applies side effects.
//!
//! Gate order matters only for the pending-question lock, which dominates
//! the pipeline; the rest are independent.

pub mod capability;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod flags;
pub mod phase;
pub mod question;
pub mod scope;
pub mod verdict;

pub use capability::{Capability, CapabilityGrant};
pub use config::{GateConfig, PhaseSkip};
pub use duplicate::{CallRecord, Classification, DuplicateAnalysis};
pub use error::GateError;
pub use flags::{ChecklistItem, Flag, FlagKind, FlagStatus, Priority};
pub use phase::{Phase, PhaseState};
pub use question::PendingQuestion;
pub use scope::{ModifiedFile, TaskScope};
pub use verdict::{merge_verdicts, Detail, GateAnnotation, Verdict};
