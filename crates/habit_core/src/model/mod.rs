//! Domain model for habits, calendar dates and progress records.
//!
//! # Responsibility
//! - Define canonical data structures used by the recurrence engine.
//! - Validate external records before they reach matching logic.
//!
//! # Invariants
//! - Every habit is identified by a stable `HabitId`.
//! - Dates are keyed by their canonical `YYYY-MM-DD` form only.

pub mod calendar;
pub mod habit;
pub mod progress;
