//! Habit domain model.
//!
//! # Responsibility
//! - Define the canonical habit record shared by grid and detail views.
//! - Validate external habit records at ingestion time.
//!
//! # Invariants
//! - `HabitId` is non-empty and never reused for another habit.
//! - `name` is trimmed and non-empty.
//! - `Recurrence` holds at least one weekday in `0..=6` (0 = Sunday).
//!
//! # See also
//! - crate::engine::recurrence

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Number of weekdays a recurrence can select.
pub const WEEKDAY_COUNT: u8 = 7;

/// Stable identifier for a habit.
///
/// Ids come from the external habit source, so they are opaque strings
/// rather than parsed UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HabitId(String);

impl HabitId {
    /// Parses a caller-provided id, trimming surrounding whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, HabitValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(HabitValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generates a fresh random id for locally created habits.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for HabitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HabitId {
    type Error = HabitValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HabitId> for String {
    fn from(value: HabitId) -> Self {
        value.0
    }
}

/// Weekly recurrence rule stored as a 7-bit weekday mask.
///
/// Bit `n` set means the habit occurs on weekday index `n`, where
/// 0 = Sunday and 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u8>")]
pub struct Recurrence(u8);

impl Recurrence {
    /// Builds a recurrence from weekday indices.
    ///
    /// Duplicates collapse into one entry. Order does not matter.
    ///
    /// # Errors
    /// - `EmptyRecurrence` when no weekday is given.
    /// - `WeekdayOutOfRange` for any index outside `0..=6`.
    pub fn from_weekdays<I>(weekdays: I) -> Result<Self, HabitValidationError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut mask = 0u8;
        for day in weekdays {
            let index = u8::try_from(day)
                .ok()
                .filter(|index| *index < WEEKDAY_COUNT)
                .ok_or(HabitValidationError::WeekdayOutOfRange(day))?;
            mask |= 1 << index;
        }
        if mask == 0 {
            return Err(HabitValidationError::EmptyRecurrence);
        }
        Ok(Self(mask))
    }

    /// Returns whether `weekday` (0 = Sunday) belongs to this rule.
    pub fn contains(self, weekday: u8) -> bool {
        weekday < WEEKDAY_COUNT && self.0 & (1 << weekday) != 0
    }

    /// Canonical ascending weekday list.
    pub fn weekdays(self) -> Vec<u8> {
        (0..WEEKDAY_COUNT).filter(|day| self.contains(*day)).collect()
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Always `false` for a validated rule; kept for API symmetry with `len`.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<Vec<i64>> for Recurrence {
    type Error = HabitValidationError;

    fn try_from(value: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_weekdays(value)
    }
}

impl From<Recurrence> for Vec<u8> {
    fn from(value: Recurrence) -> Self {
        value.weekdays()
    }
}

/// Validation failures for habit input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitValidationError {
    /// Id is blank after trim.
    EmptyId,
    /// Display name is blank after trim.
    EmptyName,
    /// Recurrence selects no weekday.
    EmptyRecurrence,
    /// Weekday index outside `0..=6`.
    WeekdayOutOfRange(i64),
}

impl HabitValidationError {
    /// Whether this failure is a recurrence defect, as opposed to a
    /// malformed id or name.
    pub fn is_invalid_recurrence(&self) -> bool {
        matches!(self, Self::EmptyRecurrence | Self::WeekdayOutOfRange(_))
    }
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "habit id must not be blank"),
            Self::EmptyName => write!(f, "habit name must not be blank"),
            Self::EmptyRecurrence => write!(f, "recurrence must select at least one weekday"),
            Self::WeekdayOutOfRange(day) => {
                write!(f, "weekday index {day} is out of range 0..=6")
            }
        }
    }
}

impl Error for HabitValidationError {}

/// A user-defined recurring commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HabitRecord", into = "HabitRecord")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub recurrence: Recurrence,
}

impl Habit {
    /// Creates a new habit with a generated id.
    pub fn new(
        name: impl Into<String>,
        weekdays: impl IntoIterator<Item = i64>,
    ) -> Result<Self, HabitValidationError> {
        Self::with_id(HabitId::generate(), name, weekdays)
    }

    /// Creates a habit with a caller-provided stable id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: HabitId,
        name: impl Into<String>,
        weekdays: impl IntoIterator<Item = i64>,
    ) -> Result<Self, HabitValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(HabitValidationError::EmptyName);
        }
        Ok(Self {
            id,
            name: trimmed.to_string(),
            recurrence: Recurrence::from_weekdays(weekdays)?,
        })
    }
}

/// Raw habit shape handed over by the external habit source.
///
/// Nothing here is validated yet; see [`ingest_habits`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRecord {
    pub id: String,
    pub name: String,
    pub recurrence: Vec<i64>,
}

impl TryFrom<HabitRecord> for Habit {
    type Error = HabitValidationError;

    fn try_from(value: HabitRecord) -> Result<Self, Self::Error> {
        Self::with_id(HabitId::new(value.id)?, value.name, value.recurrence)
    }
}

impl From<Habit> for HabitRecord {
    fn from(value: Habit) -> Self {
        Self {
            id: value.id.into(),
            recurrence: value
                .recurrence
                .weekdays()
                .into_iter()
                .map(i64::from)
                .collect(),
            name: value.name,
        }
    }
}

/// A record excluded during ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedHabit {
    pub id: String,
    pub reason: RejectReason,
}

/// Why an external record was excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Invalid(HabitValidationError),
    DuplicateId,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::DuplicateId => write!(f, "duplicate habit id"),
        }
    }
}

/// Result of converting a batch of external habit records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ingested {
    /// Valid habits in source order.
    pub habits: Vec<Habit>,
    pub rejected: Vec<RejectedHabit>,
}

/// Converts external records into validated habits.
///
/// Invalid records are excluded instead of failing the batch. When an id
/// repeats, the first occurrence wins.
pub fn ingest_habits(records: impl IntoIterator<Item = HabitRecord>) -> Ingested {
    let mut seen = HashSet::new();
    let mut ingested = Ingested::default();

    for record in records {
        let raw_id = record.id.clone();
        match Habit::try_from(record) {
            Ok(habit) if !seen.insert(habit.id.clone()) => {
                warn!(
                    "event=habit_ingest module=model status=rejected habit_id={} reason=duplicate_id",
                    habit.id
                );
                ingested.rejected.push(RejectedHabit {
                    id: raw_id,
                    reason: RejectReason::DuplicateId,
                });
            }
            Ok(habit) => ingested.habits.push(habit),
            Err(err) => {
                let reason = if err.is_invalid_recurrence() {
                    "invalid_recurrence"
                } else {
                    "invalid_record"
                };
                warn!(
                    "event=habit_ingest module=model status=rejected habit_id={} reason={}",
                    raw_id.trim(),
                    reason
                );
                ingested.rejected.push(RejectedHabit {
                    id: raw_id,
                    reason: RejectReason::Invalid(err),
                });
            }
        }
    }

    ingested
}

#[cfg(test)]
mod tests {
    use super::{ingest_habits, HabitRecord, HabitValidationError, Recurrence, RejectReason};

    fn record(id: &str, recurrence: Vec<i64>) -> HabitRecord {
        HabitRecord {
            id: id.to_string(),
            name: format!("habit {id}"),
            recurrence,
        }
    }

    #[test]
    fn recurrence_collapses_duplicates_and_sorts() {
        let rule = Recurrence::from_weekdays([5, 1, 3, 1]).unwrap();
        assert_eq!(rule.weekdays(), vec![1, 3, 5]);
        assert_eq!(rule.len(), 3);
    }

    #[test]
    fn recurrence_rejects_out_of_range_and_empty() {
        assert_eq!(
            Recurrence::from_weekdays([7]),
            Err(HabitValidationError::WeekdayOutOfRange(7))
        );
        assert_eq!(
            Recurrence::from_weekdays([-1]),
            Err(HabitValidationError::WeekdayOutOfRange(-1))
        );
        assert_eq!(
            Recurrence::from_weekdays(Vec::new()),
            Err(HabitValidationError::EmptyRecurrence)
        );
    }

    #[test]
    fn ingest_keeps_order_and_drops_invalid_records() {
        let ingested = ingest_habits(vec![
            record("b", vec![0]),
            record("bad", vec![]),
            record("a", vec![9]),
            record("c", vec![6, 0]),
            record("b", vec![2]),
        ]);

        let ids: Vec<&str> = ingested.habits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(ingested.rejected.len(), 3);
        assert_eq!(
            ingested.rejected[0].reason,
            RejectReason::Invalid(HabitValidationError::EmptyRecurrence)
        );
        assert_eq!(ingested.rejected[2].reason, RejectReason::DuplicateId);
    }
}
