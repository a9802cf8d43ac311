//! Month grid projection for the summary view.
//!
//! # Responsibility
//! - Expand habit recurrence rules into day cells for one displayed month.
//! - Join each in-month cell with the stored progress for its date.
//!
//! # Invariants
//! - The grid always holds whole 7-day rows, Sunday first.
//! - Filler cells never occur, are never today and carry no progress.
//! - Cells are rebuilt on every call and never mutated afterwards.

use crate::engine::recurrence::occurs_on_any;
use crate::engine::store::ProgressStore;
use crate::engine::tier::{tier_for, Tier};
use crate::model::calendar::{weekday_index, YearMonth};
use crate::model::habit::Habit;
use crate::model::progress::ProgressRecord;
use chrono::{Days, NaiveDate};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DAYS_PER_WEEK: usize = 7;

/// Grid construction failures.
///
/// `YearMonth` is bounded to years 1..=9999, and the fillers of those months
/// stay well inside chrono's date range, so no supported month produces this
/// error. The check stays because filler dates are computed by offset
/// arithmetic that can overflow for unbounded input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A filler date fell outside the representable date range.
    DateOutOfRange { month: YearMonth, offset: i64 },
}

impl Display for GridError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DateOutOfRange { month, offset } => write!(
                f,
                "grid cell at offset {offset} from {month}-01 is out of date range"
            ),
        }
    }
}

impl Error for GridError {}

/// One rendered day square.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    /// Display date; for filler cells, the adjacent-month date.
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    /// At least one habit recurs on this weekday.
    pub occurs: bool,
    pub progress: Option<ProgressRecord>,
}

impl DayCell {
    pub fn percent(&self) -> f64 {
        self.progress.as_ref().map_or(0.0, |record| record.percent)
    }

    pub fn tier(&self) -> Tier {
        tier_for(self.occurs, self.percent())
    }

    pub fn emphasized(&self) -> bool {
        self.is_today && self.in_current_month
    }

    /// Whether selecting this cell may open a detail session.
    pub fn is_interactive(&self) -> bool {
        self.in_current_month && self.occurs
    }
}

/// Cells for one month, row-major, Sunday first.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub month: YearMonth,
    /// Filler cells before day 1; equals the weekday index of day 1.
    pub leading: usize,
    pub cells: Vec<DayCell>,
}

impl MonthGrid {
    /// Cells grouped into 7-day rows.
    pub fn rows(&self) -> impl Iterator<Item = &[DayCell]> {
        self.cells.chunks(DAYS_PER_WEEK)
    }

    /// In-month cell for `date`, if the date belongs to this month.
    pub fn cell_for(&self, date: NaiveDate) -> Option<&DayCell> {
        self.cells
            .iter()
            .find(|cell| cell.in_current_month && cell.date == date)
    }

    pub fn in_month_cells(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter(|cell| cell.in_current_month)
    }
}

/// Builds the grid for `month`.
///
/// `today` is supplied by the caller so the result is deterministic.
pub fn build_month_grid(
    month: YearMonth,
    habits: &[Habit],
    store: &ProgressStore,
    today: NaiveDate,
) -> Result<MonthGrid, GridError> {
    let first = month.first_day();
    let leading = usize::from(weekday_index(first));
    let days = month.days_in_month() as usize;
    let total = (leading + days).div_ceil(DAYS_PER_WEEK) * DAYS_PER_WEEK;

    let mut cells = Vec::with_capacity(total);
    for index in 0..total {
        let offset = index as i64 - leading as i64;
        let date = offset_date(first, offset).ok_or(GridError::DateOutOfRange { month, offset })?;

        if month.contains(date) {
            cells.push(DayCell {
                date,
                in_current_month: true,
                is_today: date == today,
                occurs: occurs_on_any(habits, date),
                progress: store.get(date).cloned(),
            });
        } else {
            cells.push(DayCell {
                date,
                in_current_month: false,
                is_today: false,
                occurs: false,
                progress: None,
            });
        }
    }

    debug!(
        "event=grid_build module=grid status=ok month={} cells={} habits={}",
        month,
        cells.len(),
        habits.len()
    );

    Ok(MonthGrid {
        month,
        leading,
        cells,
    })
}

fn offset_date(first: NaiveDate, offset: i64) -> Option<NaiveDate> {
    let magnitude = Days::new(offset.unsigned_abs());
    if offset < 0 {
        first.checked_sub_days(magnitude)
    } else {
        first.checked_add_days(magnitude)
    }
}
