//! Core domain logic for the habit tracker.
//! This crate is the single source of truth for recurrence and progress
//! invariants.

pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use engine::grid::{build_month_grid, DayCell, GridError, MonthGrid};
pub use engine::recurrence::{occurring_on, occurs_on, occurs_on_any};
pub use engine::session::{DaySession, DayTask, DeleteConfirmation, SessionError, SessionState};
pub use engine::store::{ProgressSink, ProgressStore, SubscriptionId};
pub use engine::tier::{style_for, tier_for, CellStyle, Tier};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::calendar::{date_key, parse_date_key, weekday_index, CalendarError, YearMonth};
pub use model::habit::{
    ingest_habits, Habit, HabitId, HabitRecord, HabitValidationError, Ingested, Recurrence,
    RejectReason, RejectedHabit,
};
pub use model::progress::{completion_percent, ProgressRecord, ProgressUpdate};
pub use repo::{
    HabitRepository, MemoryTrackerRepository, ProgressRepository, RepoError, RepoResult,
    SqliteTrackerRepository,
};
pub use service::tracker_service::{
    ClosedSession, NavigationIntent, RefreshReport, TrackerError, TrackerService,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
