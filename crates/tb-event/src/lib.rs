//! # tb-event
//!
//! Tool-call event model and classification for Tollbooth.
//!
//! A host emits one raw payload per attempted tool call. This crate turns
//! that payload into a normalized [`ToolCallEvent`] and a
//! [`ClassifiedEvent`] carrying the coarse [`Intent`], the primary
//! filesystem target (if any), and the shell command text (if any).
//!
//! Classification is pure and total: malformed payloads and unknown tools
//! never error, they degrade to [`Intent::Unscoped`], which is exempt from
//! every gate except the pending-question lock.

pub mod classifier;
pub mod event;

pub use classifier::{classify, ClassifiedEvent, Intent};
pub use event::ToolCallEvent;
