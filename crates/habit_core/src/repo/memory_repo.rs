//! In-memory repository used when no persistence is configured.

use crate::model::habit::{Habit, HabitId, HabitRecord};
use crate::model::progress::ProgressRecord;
use crate::repo::{HabitRepository, ProgressRepository, RepoError, RepoResult};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    habits: Vec<HabitRecord>,
    progress: BTreeMap<NaiveDate, ProgressRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryTrackerRepository {
    state: Mutex<MemoryState>,
}

impl MemoryTrackerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_habits(habits: impl IntoIterator<Item = Habit>) -> Self {
        Self::with_records(habits.into_iter().map(HabitRecord::from))
    }

    /// Seeds raw records, including ones ingestion will reject.
    pub fn with_records(records: impl IntoIterator<Item = HabitRecord>) -> Self {
        let repo = Self::default();
        repo.lock().habits.extend(records);
        repo
    }

    /// Ids of all stored habit records, in order.
    pub fn habit_ids(&self) -> Vec<HabitId> {
        self.lock()
            .habits
            .iter()
            .filter_map(|record| HabitId::new(record.id.as_str()).ok())
            .collect()
    }

    pub fn stored_progress(&self, date: NaiveDate) -> Option<ProgressRecord> {
        self.lock().progress.get(&date).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HabitRepository for MemoryTrackerRepository {
    fn list_habits(&self) -> RepoResult<Vec<HabitRecord>> {
        Ok(self.lock().habits.clone())
    }

    fn create_habit(&self, habit: &Habit) -> RepoResult<HabitId> {
        let mut state = self.lock();
        if state.habits.iter().any(|record| record.id == habit.id.as_str()) {
            return Err(RepoError::Duplicate(habit.id.clone()));
        }
        state.habits.push(HabitRecord::from(habit.clone()));
        Ok(habit.id.clone())
    }

    fn delete_habit(&self, id: &HabitId) -> RepoResult<()> {
        let mut state = self.lock();
        let before = state.habits.len();
        state.habits.retain(|record| record.id != id.as_str());
        if state.habits.len() == before {
            return Err(RepoError::NotFound(id.clone()));
        }
        Ok(())
    }
}

impl ProgressRepository for MemoryTrackerRepository {
    fn load_progress(&self) -> RepoResult<Vec<(NaiveDate, ProgressRecord)>> {
        Ok(self
            .lock()
            .progress
            .iter()
            .map(|(date, record)| (*date, record.clone()))
            .collect())
    }

    fn save_progress(&self, date: NaiveDate, record: &ProgressRecord) -> RepoResult<()> {
        self.lock().progress.insert(date, record.clone());
        Ok(())
    }
}
