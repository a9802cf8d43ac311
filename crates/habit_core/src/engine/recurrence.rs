//! Weekly recurrence matching.

use crate::model::calendar::weekday_index;
use crate::model::habit::Habit;
use chrono::NaiveDate;

/// Returns whether `habit` occurs on `date`.
pub fn occurs_on(habit: &Habit, date: NaiveDate) -> bool {
    habit.recurrence.contains(weekday_index(date))
}

/// Returns whether at least one habit occurs on `date`.
pub fn occurs_on_any(habits: &[Habit], date: NaiveDate) -> bool {
    habits.iter().any(|habit| occurs_on(habit, date))
}

/// Habits occurring on `date`, in source order.
pub fn occurring_on(habits: &[Habit], date: NaiveDate) -> impl Iterator<Item = &Habit> {
    habits.iter().filter(move |habit| occurs_on(habit, date))
}
