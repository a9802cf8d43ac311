//! Repository contracts for the external habit source, deletion sink and
//! progress persistence, plus their implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from the engine and service layers.
//!
//! # Invariants
//! - Repositories hand out raw `HabitRecord`s; validation happens at
//!   ingestion (`model::habit::ingest_habits`), not here.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`) in
//!   addition to transport errors.

use crate::db::DbError;
use crate::model::habit::{Habit, HabitId, HabitRecord};
use crate::model::progress::ProgressRecord;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory_repo;
mod sqlite_repo;

pub use memory_repo::MemoryTrackerRepository;
pub use sqlite_repo::SqliteTrackerRepository;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(HabitId),
    Duplicate(HabitId),
    InvalidData(String),
    /// Collaborator could not be reached or refused the request.
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "habit not found: {id}"),
            Self::Duplicate(id) => write!(f, "habit already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Habit source and deletion sink.
pub trait HabitRepository {
    /// All habit records of the signed-in owner, in creation order.
    fn list_habits(&self) -> RepoResult<Vec<HabitRecord>>;
    fn create_habit(&self, habit: &Habit) -> RepoResult<HabitId>;
    /// Permanently removes a habit. Unknown ids fail with `NotFound`.
    fn delete_habit(&self, id: &HabitId) -> RepoResult<()>;
}

/// Optional progress persistence keyed by calendar date.
pub trait ProgressRepository {
    fn load_progress(&self) -> RepoResult<Vec<(NaiveDate, ProgressRecord)>>;
    /// Replaces the stored record for `date` atomically.
    fn save_progress(&self, date: NaiveDate, record: &ProgressRecord) -> RepoResult<()>;
}
