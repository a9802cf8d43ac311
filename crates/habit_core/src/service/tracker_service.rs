//! Habit tracker use-case service.
//!
//! # Responsibility
//! - Own the habit snapshot, the shared progress store and the single
//!   active day session for one signed-in owner.
//! - Bridge engine operations to the habit source, deletion sink and
//!   progress persistence.
//!
//! # Invariants
//! - At most one day session is open at a time.
//! - Toggle/delete results are in the store before the call returns.
//! - A failed fetch or delete leaves habits, store and session unchanged.
//! - The open session is rebuilt whenever the habit snapshot changes.
//! - The in-memory store is the source of truth; progress writes that fail
//!   to persist are kept and retried by `flush_progress`.

use crate::engine::grid::{build_month_grid, GridError, MonthGrid};
use crate::engine::recurrence::occurring_on;
use crate::engine::session::{DaySession, DeleteConfirmation, SessionError};
use crate::engine::store::{ProgressSink, ProgressStore};
use crate::model::calendar::YearMonth;
use crate::model::habit::{ingest_habits, Habit, HabitId, HabitValidationError, RejectedHabit};
use crate::model::progress::{ProgressRecord, ProgressUpdate};
use crate::repo::{HabitRepository, ProgressRepository, RepoError};
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Navigation requests exchanged with the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationIntent {
    /// Show the detail view for `date`.
    OpenDay {
        date: NaiveDate,
        /// Habits occurring on `date`, in source order.
        habits: Vec<Habit>,
        /// Stored progress, or an empty record.
        prior: ProgressRecord,
    },
    /// Leave the detail view.
    Back,
}

/// Errors reported by tracker use-cases.
#[derive(Debug)]
pub enum TrackerError {
    InvalidHabit(HabitValidationError),
    Grid(GridError),
    /// Detail view requested for a date without occurrences.
    NoOccurrenceToday(NaiveDate),
    /// External fetch, write or delete failed; nothing was applied.
    PersistenceFailure(RepoError),
    /// Toggle/delete called with no open day session.
    NoActiveSession,
    Session(SessionError),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHabit(err) => write!(f, "invalid habit: {err}"),
            Self::Grid(err) => write!(f, "{err}"),
            Self::NoOccurrenceToday(date) => write!(f, "no habit occurs on {date}"),
            Self::PersistenceFailure(err) => write!(f, "persistence failure: {err}"),
            Self::NoActiveSession => write!(f, "no day is open"),
            Self::Session(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidHabit(err) => Some(err),
            Self::Grid(err) => Some(err),
            Self::PersistenceFailure(err) => Some(err),
            Self::Session(err) => Some(err),
            Self::NoOccurrenceToday(_) | Self::NoActiveSession => None,
        }
    }
}

impl From<HabitValidationError> for TrackerError {
    fn from(value: HabitValidationError) -> Self {
        Self::InvalidHabit(value)
    }
}

impl From<GridError> for TrackerError {
    fn from(value: GridError) -> Self {
        Self::Grid(value)
    }
}

impl From<SessionError> for TrackerError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::NoOccurrenceToday(date) => Self::NoOccurrenceToday(date),
            SessionError::PersistenceFailure(err) => Self::PersistenceFailure(err),
            other => Self::Session(other),
        }
    }
}

/// Outcome of [`TrackerService::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub habits: usize,
    /// Records excluded during ingestion.
    pub rejected: Vec<RejectedHabit>,
    pub progress_records: usize,
}

/// Summary of a day session closed by [`TrackerService::go_back`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedSession {
    pub date: NaiveDate,
    /// Whether the session published anything.
    pub published: bool,
}

/// Top-level application session for one owner.
pub struct TrackerService<R> {
    repo: R,
    habits: Vec<Habit>,
    store: ProgressStore,
    active: Option<DaySession>,
    unsynced: BTreeSet<NaiveDate>,
}

impl<R: HabitRepository + ProgressRepository> TrackerService<R> {
    /// Creates an empty service; call [`Self::refresh`] to load data.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            habits: Vec::new(),
            store: ProgressStore::new(),
            active: None,
            unsynced: BTreeSet::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Mutable store access for subscriptions.
    pub fn store_mut(&mut self) -> &mut ProgressStore {
        &mut self.store
    }

    pub fn active_session(&self) -> Option<&DaySession> {
        self.active.as_ref()
    }

    /// Dates whose latest record has not reached progress persistence.
    pub fn unsynced_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.unsynced.iter().copied()
    }

    /// Reloads habits and stored progress.
    ///
    /// Invalid habit records are dropped. Stored progress never overwrites
    /// records that are still waiting to be persisted.
    ///
    /// # Errors
    /// - `PersistenceFailure` when either fetch fails; state is unchanged.
    pub fn refresh(&mut self) -> Result<RefreshReport, TrackerError> {
        let records = self
            .repo
            .list_habits()
            .map_err(|err| fetch_failure("habit_fetch", err))?;
        let progress = self
            .repo
            .load_progress()
            .map_err(|err| fetch_failure("progress_fetch", err))?;

        let ingested = ingest_habits(records);
        self.habits = ingested.habits;

        let unsynced = &self.unsynced;
        let progress: Vec<(NaiveDate, ProgressRecord)> = progress
            .into_iter()
            .filter(|(date, _)| !unsynced.contains(date))
            .collect();
        let progress_records = progress.len();
        self.store.seed(progress);
        self.reload_active_session();

        info!(
            "event=tracker_refresh module=service status=ok habits={} rejected={} progress_records={}",
            self.habits.len(),
            ingested.rejected.len(),
            progress_records
        );
        Ok(RefreshReport {
            habits: self.habits.len(),
            rejected: ingested.rejected,
            progress_records,
        })
    }

    /// Validates, persists and appends a new habit.
    pub fn create_habit(&mut self, name: &str, weekdays: &[i64]) -> Result<Habit, TrackerError> {
        let habit = Habit::new(name, weekdays.iter().copied())?;
        self.repo.create_habit(&habit).map_err(|err| {
            error!(
                "event=habit_create module=service status=error habit_id={} error={}",
                habit.id, err
            );
            TrackerError::PersistenceFailure(err)
        })?;

        info!(
            "event=habit_create module=service status=ok habit_id={} weekdays={}",
            habit.id,
            habit.recurrence.len()
        );
        self.habits.push(habit.clone());
        self.reload_active_session();
        Ok(habit)
    }

    /// Builds the summary grid for `month` from the current state.
    pub fn month_grid(&self, month: YearMonth, today: NaiveDate) -> Result<MonthGrid, TrackerError> {
        Ok(build_month_grid(month, &self.habits, &self.store, today)?)
    }

    /// Opens the detail session for `date`, replacing any open one.
    ///
    /// # Errors
    /// - `NoOccurrenceToday` when no habit occurs on `date`; any open
    ///   session stays open.
    pub fn select_day(&mut self, date: NaiveDate) -> Result<NavigationIntent, TrackerError> {
        let prior = self.store.get(date).cloned();
        let session = DaySession::open(date, &self.habits, prior.as_ref())?;

        if let Some(previous) = self.active.replace(session) {
            debug!(
                "event=session_replace module=service status=ok previous_date={} date={}",
                previous.date(),
                date
            );
        }

        Ok(NavigationIntent::OpenDay {
            date,
            habits: occurring_on(&self.habits, date).cloned().collect(),
            prior: prior.unwrap_or_default(),
        })
    }

    /// Toggles one occurrence in the open session.
    pub fn toggle(&mut self, habit_id: &HabitId) -> Result<ProgressUpdate, TrackerError> {
        let session = self.active.as_mut().ok_or(TrackerError::NoActiveSession)?;
        let update = session.toggle(habit_id, &mut self.store)?;
        self.write_through(&update);
        Ok(update)
    }

    /// Permanently deletes a habit occurring in the open session.
    ///
    /// Other dates that reference the habit are left as they are and heal
    /// when reopened.
    pub fn delete_habit(
        &mut self,
        habit_id: &HabitId,
        confirmation: DeleteConfirmation,
    ) -> Result<ProgressUpdate, TrackerError> {
        let session = self.active.as_mut().ok_or(TrackerError::NoActiveSession)?;
        let update = session.delete(habit_id, confirmation, &self.repo, &mut self.store)?;
        self.habits.retain(|habit| habit.id != *habit_id);
        self.write_through(&update);
        Ok(update)
    }

    /// Handles the `Back` navigation intent by closing the open session.
    ///
    /// Returns `None` when no session was open.
    pub fn go_back(&mut self) -> Option<ClosedSession> {
        let session = self.active.take()?;
        let closed = ClosedSession {
            date: session.date(),
            published: session.has_writes(),
        };
        debug!(
            "event=session_close module=service status=ok date={} published={}",
            closed.date, closed.published
        );
        Some(closed)
    }

    /// Retries persisting records that failed to save earlier.
    ///
    /// Returns how many dates were written. Stops at the first failure and
    /// keeps the remaining dates queued.
    pub fn flush_progress(&mut self) -> Result<usize, TrackerError> {
        let pending: Vec<NaiveDate> = self.unsynced.iter().copied().collect();
        let mut written = 0;

        for date in pending {
            let record = self.store.get(date).cloned().unwrap_or_default();
            self.repo
                .save_progress(date, &record)
                .map_err(TrackerError::PersistenceFailure)?;
            self.unsynced.remove(&date);
            written += 1;
        }

        if written > 0 {
            info!("event=progress_flush module=service status=ok written={written}");
        }
        Ok(written)
    }

    // Keeps the open checklist and its stored record in step with the
    // current habit snapshot.
    fn reload_active_session(&mut self) {
        let Some(session) = self.active.as_mut() else {
            return;
        };
        if let Err(err) = session.reload(&self.habits) {
            warn!(
                "event=session_reload module=service status=closed date={} error={}",
                session.date(),
                err
            );
            self.active = None;
            return;
        }

        let update = ProgressUpdate {
            date: session.date(),
            record: session.record(),
        };
        let stored = self.store.get(update.date);
        if stored.is_none() || stored == Some(&update.record) {
            return;
        }
        self.store.publish(update.clone());
        self.write_through(&update);
    }

    fn write_through(&mut self, update: &ProgressUpdate) {
        match self.repo.save_progress(update.date, &update.record) {
            Ok(()) => {
                self.unsynced.remove(&update.date);
            }
            Err(err) => {
                warn!(
                    "event=progress_save module=service status=error date={} error={}",
                    update.date, err
                );
                self.unsynced.insert(update.date);
            }
        }
    }
}

fn fetch_failure(event: &str, err: RepoError) -> TrackerError {
    error!("event={event} module=service status=error error={err}");
    TrackerError::PersistenceFailure(err)
}

#[cfg(test)]
mod tests {
    use super::{NavigationIntent, TrackerError, TrackerService};
    use crate::engine::session::DeleteConfirmation;
    use crate::model::habit::{Habit, HabitId};
    use crate::repo::MemoryTrackerRepository;
    use chrono::NaiveDate;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn id(value: &str) -> HabitId {
        HabitId::new(value).unwrap()
    }

    fn service() -> TrackerService<MemoryTrackerRepository> {
        let habits = vec![
            Habit::with_id(id("h1"), "read", [1]).unwrap(),
            Habit::with_id(id("h2"), "run", [1, 3]).unwrap(),
        ];
        let mut service = TrackerService::new(MemoryTrackerRepository::with_habits(habits));
        service.refresh().unwrap();
        service
    }

    #[test]
    fn select_day_emits_open_intent_with_empty_prior() {
        let mut service = service();
        let intent = service.select_day(monday()).unwrap();
        match intent {
            NavigationIntent::OpenDay { date, habits, prior } => {
                assert_eq!(date, monday());
                assert_eq!(habits.len(), 2);
                assert_eq!(prior.percent, 0.0);
                assert!(prior.completed_ids.is_empty());
            }
            NavigationIntent::Back => panic!("expected OpenDay"),
        }
    }

    #[test]
    fn toggle_without_session_is_reported() {
        let mut service = service();
        assert!(matches!(
            service.toggle(&id("h1")),
            Err(TrackerError::NoActiveSession)
        ));
    }

    #[test]
    fn go_back_without_toggle_writes_nothing() {
        let mut service = service();
        service.select_day(monday()).unwrap();
        let closed = service.go_back().unwrap();
        assert!(!closed.published);
        assert!(service.store().is_empty());
        assert!(service.go_back().is_none());
    }

    #[test]
    fn create_habit_extends_open_session() {
        let mut service = service();
        service.select_day(monday()).unwrap();
        service.toggle(&id("h1")).unwrap();

        let added = service.create_habit("stretch", &[1]).unwrap();
        let session = service.active_session().unwrap();
        assert_eq!(session.tasks().len(), 3);
        assert!(session.tasks().iter().any(|task| task.habit_id == added.id && !task.done));
        assert_eq!(service.store().get(monday()), Some(&session.record()));
    }

    #[test]
    fn delete_removes_habit_from_snapshot() {
        let mut service = service();
        service.select_day(monday()).unwrap();
        service
            .delete_habit(&id("h2"), DeleteConfirmation::confirm(id("h2")))
            .unwrap();
        assert_eq!(service.habits().len(), 1);
        assert_eq!(service.repository().habit_ids(), vec![id("h1")]);
    }
}
