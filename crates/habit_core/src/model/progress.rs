//! Per-date completion records.
//!
//! # Invariants
//! - `percent == 100 * |completed_ids| / |occurring|` when at least one
//!   habit occurs on the date.
//! - `percent == 0` and `completed_ids` is empty when nothing occurs.
//! - `completed_ids` is a subset of the ids occurring on the date at the
//!   time the record was written.

use crate::model::habit::HabitId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Completion aggregate for one calendar date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Completion percentage in `[0, 100]`.
    pub percent: f64,
    pub completed_ids: BTreeSet<HabitId>,
}

impl ProgressRecord {
    /// Builds a record from completed ids and the ids occurring that date.
    ///
    /// Completed ids that do not occur are dropped, so the result always
    /// satisfies the record invariant.
    pub fn from_completion<'a>(
        completed: impl IntoIterator<Item = &'a HabitId>,
        occurring: &BTreeSet<HabitId>,
    ) -> Self {
        let completed_ids: BTreeSet<HabitId> = completed
            .into_iter()
            .filter(|id| occurring.contains(*id))
            .cloned()
            .collect();
        Self {
            percent: completion_percent(completed_ids.len(), occurring.len()),
            completed_ids,
        }
    }

    pub fn is_done(&self, id: &HabitId) -> bool {
        self.completed_ids.contains(id)
    }

    /// Whether `percent` matches what `completed_ids` and `occurring` imply.
    pub fn is_consistent_with(&self, occurring: &BTreeSet<HabitId>) -> bool {
        if !self.completed_ids.is_subset(occurring) {
            return false;
        }
        self.percent == completion_percent(self.completed_ids.len(), occurring.len())
    }
}

/// `100 * done / total`, or 0 when `total == 0`.
pub fn completion_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * done as f64 / total as f64
}

/// A record published for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub date: NaiveDate,
    pub record: ProgressRecord,
}

#[cfg(test)]
mod tests {
    use super::{completion_percent, ProgressRecord};
    use crate::model::habit::HabitId;
    use std::collections::BTreeSet;

    fn ids(values: &[&str]) -> BTreeSet<HabitId> {
        values.iter().map(|v| HabitId::new(*v).unwrap()).collect()
    }

    #[test]
    fn completion_percent_guards_zero_total() {
        assert_eq!(completion_percent(0, 0), 0.0);
        assert_eq!(completion_percent(1, 2), 50.0);
        assert_eq!(completion_percent(2, 2), 100.0);
    }

    #[test]
    fn from_completion_drops_ids_that_do_not_occur() {
        let occurring = ids(&["h1", "h2"]);
        let completed = ids(&["h1", "gone"]);
        let record = ProgressRecord::from_completion(&completed, &occurring);
        assert_eq!(record.completed_ids, ids(&["h1"]));
        assert_eq!(record.percent, 50.0);
        assert!(record.is_consistent_with(&occurring));
    }

    #[test]
    fn default_record_is_empty() {
        let record = ProgressRecord::default();
        assert_eq!(record.percent, 0.0);
        assert!(record.completed_ids.is_empty());
        assert!(record.is_consistent_with(&BTreeSet::new()));
    }
}
