//! Habit recurrence and daily progress engine.
//!
//! # Responsibility
//! - Expand weekly recurrence rules into month grids.
//! - Track per-date completion and resolve it into display tiers.
//! - Run day detail sessions that write back into the shared store.
//!
//! # Invariants
//! - Everything here is synchronous; the only side effect is the explicit
//!   publish into a `ProgressSink`.

pub mod grid;
pub mod recurrence;
pub mod session;
pub mod store;
pub mod tier;
