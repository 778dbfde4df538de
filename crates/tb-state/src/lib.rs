//! # tb-state
//!
//! Shared state store for the Tollbooth gate pipeline.
//!
//! Every gate reads and writes namespaced, TTL-scoped JSON entries through
//! the [`StateStore`] trait. The file-backed implementation
//! ([`JsonFileStore`]) keeps one JSON document per namespace so gates that
//! own disjoint namespaces never contend on a lock, and a corrupt or
//! missing backing file degrades to an empty namespace instead of an error.
//!
//! ## Key invariants
//!
//! - **Expired == absent**: a read of an entry past its TTL is
//!   indistinguishable from a read of a missing key.
//! - **Self-healing**: unreadable backing data is treated as empty and
//!   logged, never propagated upward.
//! - **Scoped atomicity**: read-modify-write sequences (violation counters,
//!   waste totals) go through [`StateStore::update`] under the owning
//!   namespace's lock, not a process-wide lock.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{ns, StateEntry};
pub use error::StateError;
pub use store::{JsonFileStore, MemoryStore, StateStore};
