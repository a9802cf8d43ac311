#![allow(dead_code)]

use chrono::NaiveDate;
use habit_core::{
    Habit, HabitId, HabitRecord, HabitRepository, MemoryTrackerRepository, ProgressRecord,
    ProgressRepository, RepoError, RepoResult,
};
use std::sync::Mutex;

/// Calls that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    List,
    Load,
    Delete,
    Save,
}

/// Memory repository whose next call of a given kind can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyRepository {
    inner: MemoryTrackerRepository,
    pending: Mutex<Vec<Call>>,
}

impl FlakyRepository {
    pub fn with_habits(habits: impl IntoIterator<Item = Habit>) -> Self {
        Self {
            inner: MemoryTrackerRepository::with_habits(habits),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &MemoryTrackerRepository {
        &self.inner
    }

    pub fn fail_next(&self, call: Call) {
        self.pending.lock().unwrap().push(call);
    }

    fn check(&self, call: Call) -> RepoResult<()> {
        let mut pending = self.pending.lock().unwrap();
        match pending.iter().position(|armed| *armed == call) {
            Some(index) => {
                pending.remove(index);
                Err(RepoError::Unavailable(format!("{call:?} unavailable")))
            }
            None => Ok(()),
        }
    }
}

impl HabitRepository for FlakyRepository {
    fn list_habits(&self) -> RepoResult<Vec<HabitRecord>> {
        self.check(Call::List)?;
        self.inner.list_habits()
    }

    fn create_habit(&self, habit: &Habit) -> RepoResult<HabitId> {
        self.inner.create_habit(habit)
    }

    fn delete_habit(&self, id: &HabitId) -> RepoResult<()> {
        self.check(Call::Delete)?;
        self.inner.delete_habit(id)
    }
}

impl ProgressRepository for FlakyRepository {
    fn load_progress(&self) -> RepoResult<Vec<(NaiveDate, ProgressRecord)>> {
        self.check(Call::Load)?;
        self.inner.load_progress()
    }

    fn save_progress(&self, date: NaiveDate, record: &ProgressRecord) -> RepoResult<()> {
        self.check(Call::Save)?;
        self.inner.save_progress(date, record)
    }
}
