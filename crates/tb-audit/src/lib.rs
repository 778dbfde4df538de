//! # tb-audit
//!
//! Tamper-evident decision log for Tollbooth.
//!
//! Every evaluation appends one [`DecisionRecord`] to an append-only
//! JSONL file. Records are hash-chained: each carries the SHA-256 of the
//! previous line, so inserting, deleting, or editing a record breaks the
//! chain and is detected by [`DecisionLog::verify_chain`]. Overrides are
//! recorded here too, which is what keeps the bypass channels honest.

pub mod error;
pub mod hasher;
pub mod log;
pub mod record;

pub use error::AuditError;
pub use log::DecisionLog;
pub use record::DecisionRecord;
