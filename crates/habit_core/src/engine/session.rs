//! Day detail session: per-date checklist of occurring habits.
//!
//! # Responsibility
//! - Seed per-occurrence done flags from the stored progress of one date.
//! - Apply toggle/delete interactions and publish the resulting record.
//!
//! # Invariants
//! - Every successful toggle/delete publishes exactly one update before
//!   returning; failed operations publish nothing and change nothing.
//! - Published records always satisfy the progress record invariant
//!   against the session's current task list.
//! - A habit is deleted only with a confirmation token for that habit.
//!
//! # State machine
//! `Uninitialized -> Loaded -> Dirty -> Saved`, and `Saved -> Dirty` on the
//! next interaction. `Dirty` is only held while a publish is in flight.

use crate::engine::recurrence::occurring_on;
use crate::engine::store::ProgressSink;
use crate::model::habit::{Habit, HabitId};
use crate::model::progress::{completion_percent, ProgressRecord, ProgressUpdate};
use crate::repo::{HabitRepository, RepoError};
use chrono::NaiveDate;
use log::{debug, error, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Loaded,
    /// Local task list changed, publish pending.
    Dirty,
    /// Last change published to the store.
    Saved,
}

/// One occurring habit in the detail checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTask {
    pub habit_id: HabitId,
    pub name: String,
    pub done: bool,
}

/// Proof that the user confirmed deleting one specific habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    habit_id: HabitId,
}

impl DeleteConfirmation {
    /// Records the user's confirmation for `habit_id`.
    pub fn confirm(habit_id: HabitId) -> Self {
        Self { habit_id }
    }

    pub fn habit_id(&self) -> &HabitId {
        &self.habit_id
    }
}

#[derive(Debug)]
pub enum SessionError {
    /// No habit occurs on the requested date.
    NoOccurrenceToday(NaiveDate),
    /// Interaction attempted before `load`.
    NotLoaded,
    /// `load` called twice on one session.
    AlreadyLoaded(NaiveDate),
    /// Habit id is not part of this date's checklist.
    UnknownOccurrence(HabitId),
    /// Confirmation token was issued for a different habit.
    ConfirmationMismatch {
        requested: HabitId,
        confirmed: HabitId,
    },
    /// Deletion sink rejected the removal.
    PersistenceFailure(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOccurrenceToday(date) => write!(f, "no habit occurs on {date}"),
            Self::NotLoaded => write!(f, "day session is not loaded"),
            Self::AlreadyLoaded(date) => write!(f, "day session for {date} is already loaded"),
            Self::UnknownOccurrence(id) => write!(f, "habit {id} does not occur in this session"),
            Self::ConfirmationMismatch {
                requested,
                confirmed,
            } => write!(
                f,
                "delete of habit {requested} was not confirmed (confirmation is for {confirmed})"
            ),
            Self::PersistenceFailure(err) => write!(f, "persistence failure: {err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PersistenceFailure(err) => Some(err),
            _ => None,
        }
    }
}

/// Transient view model for a single date.
#[derive(Debug, Clone)]
pub struct DaySession {
    date: NaiveDate,
    state: SessionState,
    tasks: Vec<DayTask>,
    writes: usize,
}

impl DaySession {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            state: SessionState::Uninitialized,
            tasks: Vec::new(),
            writes: 0,
        }
    }

    /// Creates and loads a session in one step.
    pub fn open(
        date: NaiveDate,
        habits: &[Habit],
        prior: Option<&ProgressRecord>,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(date);
        session.load(habits, prior)?;
        Ok(session)
    }

    /// Builds the checklist for this date.
    ///
    /// Done flags come from `prior`; prior ids that no longer occur (for
    /// example deleted habits) are dropped silently.
    ///
    /// # Errors
    /// - `NoOccurrenceToday` when no habit occurs on the date; the session
    ///   stays uninitialized.
    /// - `AlreadyLoaded` on a second call.
    pub fn load(
        &mut self,
        habits: &[Habit],
        prior: Option<&ProgressRecord>,
    ) -> Result<&[DayTask], SessionError> {
        if self.state != SessionState::Uninitialized {
            return Err(SessionError::AlreadyLoaded(self.date));
        }

        let tasks: Vec<DayTask> = occurring_on(habits, self.date)
            .map(|habit| DayTask {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                done: prior.is_some_and(|record| record.is_done(&habit.id)),
            })
            .collect();

        if tasks.is_empty() {
            return Err(SessionError::NoOccurrenceToday(self.date));
        }

        let restored = tasks.iter().filter(|task| task.done).count();
        let stale = prior.map_or(0, |record| {
            record.completed_ids.len().saturating_sub(restored)
        });
        debug!(
            "event=session_load module=session status=ok date={} tasks={} restored={} stale_dropped={}",
            self.date,
            tasks.len(),
            restored,
            stale
        );

        self.tasks = tasks;
        self.state = SessionState::Loaded;
        Ok(&self.tasks)
    }

    /// Rebuilds the checklist from a newer habit snapshot.
    ///
    /// Done flags carry over for habits that still occur; new occurrences
    /// start not done. Nothing is published.
    ///
    /// # Errors
    /// - `NotLoaded` before `load`.
    /// - `NoOccurrenceToday` when nothing occurs any more; the session is
    ///   left unchanged.
    pub fn reload(&mut self, habits: &[Habit]) -> Result<&[DayTask], SessionError> {
        self.ensure_loaded()?;
        let done: BTreeSet<&HabitId> = self
            .tasks
            .iter()
            .filter(|task| task.done)
            .map(|task| &task.habit_id)
            .collect();

        let tasks: Vec<DayTask> = occurring_on(habits, self.date)
            .map(|habit| DayTask {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                done: done.contains(&habit.id),
            })
            .collect();
        if tasks.is_empty() {
            return Err(SessionError::NoOccurrenceToday(self.date));
        }

        debug!(
            "event=session_reload module=session status=ok date={} tasks_before={} tasks_after={}",
            self.date,
            self.tasks.len(),
            tasks.len()
        );
        self.tasks = tasks;
        Ok(&self.tasks)
    }

    /// Flips the done flag of `habit_id` and publishes the new record.
    pub fn toggle(
        &mut self,
        habit_id: &HabitId,
        sink: &mut impl ProgressSink,
    ) -> Result<ProgressUpdate, SessionError> {
        self.ensure_loaded()?;
        let index = self.position(habit_id)?;

        self.state = SessionState::Dirty;
        self.tasks[index].done = !self.tasks[index].done;
        let update = self.commit(sink);

        debug!(
            "event=session_toggle module=session status=ok date={} habit_id={} done={} percent={:.2}",
            self.date, habit_id, self.tasks[index].done, update.record.percent
        );
        Ok(update)
    }

    /// Permanently deletes `habit_id` through `deletion`, then drops it
    /// from this checklist and publishes the recomputed record.
    ///
    /// The denominator of the new percent is the reduced task list.
    ///
    /// # Errors
    /// - `ConfirmationMismatch` when `confirmation` names another habit.
    /// - `PersistenceFailure` when the deletion sink fails; the session is
    ///   left unchanged and nothing is published.
    pub fn delete<R>(
        &mut self,
        habit_id: &HabitId,
        confirmation: DeleteConfirmation,
        deletion: &R,
        sink: &mut impl ProgressSink,
    ) -> Result<ProgressUpdate, SessionError>
    where
        R: HabitRepository + ?Sized,
    {
        self.ensure_loaded()?;
        if confirmation.habit_id != *habit_id {
            return Err(SessionError::ConfirmationMismatch {
                requested: habit_id.clone(),
                confirmed: confirmation.habit_id,
            });
        }
        let index = self.position(habit_id)?;

        if let Err(err) = deletion.delete_habit(habit_id) {
            error!(
                "event=habit_delete module=session status=error date={} habit_id={} error={}",
                self.date, habit_id, err
            );
            return Err(SessionError::PersistenceFailure(err));
        }

        self.state = SessionState::Dirty;
        self.tasks.remove(index);
        let update = self.commit(sink);

        info!(
            "event=habit_delete module=session status=ok date={} habit_id={} remaining={} percent={:.2}",
            self.date,
            habit_id,
            self.tasks.len(),
            update.record.percent
        );
        Ok(update)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tasks(&self) -> &[DayTask] {
        &self.tasks
    }

    /// Whether any update has been published by this session.
    pub fn has_writes(&self) -> bool {
        self.writes > 0
    }

    pub fn percent(&self) -> f64 {
        let done = self.tasks.iter().filter(|task| task.done).count();
        completion_percent(done, self.tasks.len())
    }

    /// Current record as it would be published.
    pub fn record(&self) -> ProgressRecord {
        ProgressRecord {
            percent: self.percent(),
            completed_ids: self
                .tasks
                .iter()
                .filter(|task| task.done)
                .map(|task| task.habit_id.clone())
                .collect(),
        }
    }

    fn commit(&mut self, sink: &mut impl ProgressSink) -> ProgressUpdate {
        let update = ProgressUpdate {
            date: self.date,
            record: self.record(),
        };
        sink.publish(update.clone());
        self.writes += 1;
        self.state = SessionState::Saved;
        update
    }

    fn ensure_loaded(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Uninitialized {
            return Err(SessionError::NotLoaded);
        }
        Ok(())
    }

    fn position(&self, habit_id: &HabitId) -> Result<usize, SessionError> {
        self.tasks
            .iter()
            .position(|task| task.habit_id == *habit_id)
            .ok_or_else(|| SessionError::UnknownOccurrence(habit_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::{DayTask, DaySession, DeleteConfirmation, SessionError, SessionState};
    use crate::engine::store::{ProgressSink, ProgressStore};
    use crate::model::habit::{Habit, HabitId, HabitRecord};
    use crate::model::progress::ProgressRecord;
    use crate::repo::{HabitRepository, MemoryTrackerRepository, RepoError, RepoResult};
    use chrono::NaiveDate;

    // 2026-10-19 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn id(value: &str) -> HabitId {
        HabitId::new(value).unwrap()
    }

    fn habit(value: &str, days: &[i64]) -> Habit {
        Habit::with_id(id(value), format!("habit {value}"), days.iter().copied()).unwrap()
    }

    fn two_habits() -> Vec<Habit> {
        vec![habit("h1", &[1, 3]), habit("off", &[2]), habit("h2", &[1])]
    }

    #[test]
    fn load_filters_by_weekday_and_defaults_to_not_done() {
        let mut session = DaySession::new(monday());
        assert_eq!(session.state(), SessionState::Uninitialized);

        let tasks = session.load(&two_habits(), None).unwrap().to_vec();
        assert_eq!(
            tasks,
            vec![
                DayTask {
                    habit_id: id("h1"),
                    name: "habit h1".to_string(),
                    done: false,
                },
                DayTask {
                    habit_id: id("h2"),
                    name: "habit h2".to_string(),
                    done: false,
                },
            ]
        );
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(!session.has_writes());
    }

    #[test]
    fn load_refuses_dates_without_occurrences() {
        let mut session = DaySession::new(monday());
        let err = session.load(&[habit("x", &[0])], None).unwrap_err();
        assert!(matches!(err, SessionError::NoOccurrenceToday(date) if date == monday()));
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn load_restores_prior_and_drops_stale_ids() {
        let prior = ProgressRecord {
            percent: 66.0,
            completed_ids: [id("h2"), id("deleted")].into_iter().collect(),
        };
        let session = DaySession::open(monday(), &two_habits(), Some(&prior)).unwrap();
        let done: Vec<bool> = session.tasks().iter().map(|task| task.done).collect();
        assert_eq!(done, vec![false, true]);
        assert_eq!(session.percent(), 50.0);
        assert_eq!(session.record().completed_ids, [id("h2")].into_iter().collect());
    }

    #[test]
    fn toggles_publish_and_reach_full_completion() {
        let mut store = ProgressStore::new();
        let mut session = DaySession::open(monday(), &two_habits(), None).unwrap();

        let first = session.toggle(&id("h1"), &mut store).unwrap();
        assert_eq!(first.record.percent, 50.0);
        assert_eq!(first.record.completed_ids, [id("h1")].into_iter().collect());
        assert_eq!(session.state(), SessionState::Saved);
        assert_eq!(store.get(monday()), Some(&first.record));

        let second = session.toggle(&id("h2"), &mut store).unwrap();
        assert_eq!(second.record.percent, 100.0);
        assert_eq!(store.percent_for(monday()), 100.0);
    }

    #[test]
    fn double_toggle_restores_previous_record() {
        let mut store = ProgressStore::new();
        let mut session = DaySession::open(monday(), &two_habits(), None).unwrap();
        session.toggle(&id("h1"), &mut store).unwrap();
        let before = store.get(monday()).cloned();

        session.toggle(&id("h2"), &mut store).unwrap();
        session.toggle(&id("h2"), &mut store).unwrap();
        assert_eq!(store.get(monday()).cloned(), before);
    }

    #[test]
    fn toggle_rejects_unknown_and_unloaded() {
        let mut store = ProgressStore::new();
        let mut fresh = DaySession::new(monday());
        assert!(matches!(
            fresh.toggle(&id("h1"), &mut store),
            Err(SessionError::NotLoaded)
        ));

        let mut session = DaySession::open(monday(), &two_habits(), None).unwrap();
        assert!(matches!(
            session.toggle(&id("off"), &mut store),
            Err(SessionError::UnknownOccurrence(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn delete_recomputes_against_reduced_denominator() {
        let repo = MemoryTrackerRepository::with_habits(two_habits());
        let mut store = ProgressStore::new();
        let habits = vec![habit("h1", &[1]), habit("h2", &[1]), habit("h3", &[1])];
        let mut session = DaySession::open(monday(), &habits, None).unwrap();
        session.toggle(&id("h1"), &mut store).unwrap();
        assert!((store.percent_for(monday()) - 100.0 / 3.0).abs() < 1e-9);

        let update = session
            .delete(
                &id("h2"),
                DeleteConfirmation::confirm(id("h2")),
                &repo,
                &mut store,
            )
            .unwrap();
        assert_eq!(update.record.percent, 50.0);
        assert_eq!(session.tasks().len(), 2);
        assert_eq!(store.get(monday()), Some(&update.record));
        assert!(repo.habit_ids().iter().all(|remaining| *remaining != id("h2")));
    }

    #[test]
    fn delete_requires_matching_confirmation() {
        let repo = MemoryTrackerRepository::with_habits(two_habits());
        let mut store = ProgressStore::new();
        let mut session = DaySession::open(monday(), &two_habits(), None).unwrap();

        let err = session
            .delete(
                &id("h1"),
                DeleteConfirmation::confirm(id("h2")),
                &repo,
                &mut store,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::ConfirmationMismatch { .. }));
        assert_eq!(session.tasks().len(), 2);
        assert_eq!(repo.habit_ids().len(), 3);
    }

    #[test]
    fn reload_keeps_done_flags_and_picks_up_new_occurrences() {
        let mut store = ProgressStore::new();
        let mut session = DaySession::open(monday(), &two_habits(), None).unwrap();
        session.toggle(&id("h2"), &mut store).unwrap();

        let mut habits = two_habits();
        habits.retain(|habit| habit.id != id("h1"));
        habits.push(habit("h3", &[1, 5]));
        let tasks = session.reload(&habits).unwrap();

        let flags: Vec<(String, bool)> = tasks
            .iter()
            .map(|task| (task.habit_id.to_string(), task.done))
            .collect();
        assert_eq!(
            flags,
            vec![("h2".to_string(), true), ("h3".to_string(), false)]
        );
        assert_eq!(session.percent(), 50.0);
    }

    #[test]
    fn reload_without_occurrences_leaves_session_unchanged() {
        let mut session = DaySession::open(monday(), &two_habits(), None).unwrap();
        let err = session.reload(&[habit("off", &[2])]).unwrap_err();
        assert!(matches!(err, SessionError::NoOccurrenceToday(_)));
        assert_eq!(session.tasks().len(), 2);
        assert!(matches!(
            DaySession::new(monday()).reload(&two_habits()),
            Err(SessionError::NotLoaded)
        ));
    }

    struct OfflineSink;

    impl HabitRepository for OfflineSink {
        fn list_habits(&self) -> RepoResult<Vec<HabitRecord>> {
            Ok(Vec::new())
        }

        fn create_habit(&self, habit: &Habit) -> RepoResult<HabitId> {
            Ok(habit.id.clone())
        }

        fn delete_habit(&self, _id: &HabitId) -> RepoResult<()> {
            Err(RepoError::Unavailable("sink offline".to_string()))
        }
    }

    #[test]
    fn delete_failure_leaves_session_untouched() {
        let repo = OfflineSink;
        let mut store = ProgressStore::new();
        let mut session = DaySession::open(monday(), &two_habits(), None).unwrap();

        let err = session
            .delete(
                &id("h1"),
                DeleteConfirmation::confirm(id("h1")),
                &repo,
                &mut store,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::PersistenceFailure(_)));
        assert_eq!(session.tasks().len(), 2);
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(store.is_empty());
    }

    #[test]
    fn deleting_last_task_publishes_zero_record() {
        let repo = MemoryTrackerRepository::with_habits(vec![habit("solo", &[1])]);
        let mut store = ProgressStore::new();
        let mut session = DaySession::open(monday(), &[habit("solo", &[1])], None).unwrap();
        session.toggle(&id("solo"), &mut store).unwrap();

        let update = session
            .delete(
                &id("solo"),
                DeleteConfirmation::confirm(id("solo")),
                &repo,
                &mut store,
            )
            .unwrap();
        assert_eq!(update.record, ProgressRecord::default());
        assert!(session.tasks().is_empty());
    }

    struct RecordingSink(Vec<f64>);

    impl ProgressSink for RecordingSink {
        fn publish(&mut self, update: crate::model::progress::ProgressUpdate) {
            self.0.push(update.record.percent);
        }
    }

    #[test]
    fn every_toggle_publishes_exactly_once() {
        let mut sink = RecordingSink(Vec::new());
        let mut session = DaySession::open(monday(), &two_habits(), None).unwrap();
        session.toggle(&id("h1"), &mut sink).unwrap();
        session.toggle(&id("h2"), &mut sink).unwrap();
        session.toggle(&id("h1"), &mut sink).unwrap();
        assert_eq!(sink.0, vec![50.0, 100.0, 50.0]);
    }
}
