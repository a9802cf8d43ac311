//! Calendar primitives: months, weekday numbering and date keys.
//!
//! # Invariants
//! - Weekday index 0 is Sunday, 6 is Saturday.
//! - Date keys are zero-padded `YYYY-MM-DD`; lexical order equals
//!   chronological order for every supported year (1..=9999).

use chrono::{Datelike, Months, NaiveDate};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const DATE_KEY_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    MonthOutOfRange(u32),
    YearOutOfRange(i32),
    InvalidDateKey(String),
}

impl Display for CalendarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonthOutOfRange(month) => write!(f, "month {month} is out of range 1..=12"),
            Self::YearOutOfRange(year) => {
                write!(f, "year {year} is out of range {MIN_YEAR}..={MAX_YEAR}")
            }
            Self::InvalidDateKey(value) => {
                write!(f, "invalid date key `{value}`; expected YYYY-MM-DD")
            }
        }
    }
}

impl Error for CalendarError {}

/// A displayed calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, CalendarError> {
        if !(1..=12).contains(&month) {
            return Err(CalendarError::MonthOutOfRange(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(CalendarError::YearOutOfRange(year));
        }
        Ok(Self { year, month })
    }

    /// Month containing `date`.
    pub fn of(date: NaiveDate) -> Result<Self, CalendarError> {
        Self::new(date.year(), date.month())
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn first_day(self) -> NaiveDate {
        // Fields are range-checked in `new`, so day 1 always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Number of days in this month, leap years included.
    pub fn days_in_month(self) -> u32 {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .map_or(31, |last| last.day())
    }

    /// Whether `date` falls inside this month.
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Following month, or `None` past December 9999.
    pub fn succ(self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1).ok()
        } else {
            Self::new(self.year, self.month + 1).ok()
        }
    }

    /// Preceding month, or `None` before January of year 1.
    pub fn pred(self) -> Option<Self> {
        if self.month == 1 {
            Self::new(self.year - 1, 12).ok()
        } else {
            Self::new(self.year, self.month - 1).ok()
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Weekday index of `date`, 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always in 0..=6.
    date.weekday().num_days_from_sunday() as u8
}

/// Canonical storage key for `date`.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parses a canonical `YYYY-MM-DD` key.
///
/// Rejects anything that does not round-trip to the same key, such as
/// unpadded fields or surrounding whitespace.
pub fn parse_date_key(value: &str) -> Result<NaiveDate, CalendarError> {
    let invalid = || CalendarError::InvalidDateKey(value.to_string());
    if value.len() != DATE_KEY_LEN {
        return Err(invalid());
    }
    let date = NaiveDate::parse_from_str(value, DATE_KEY_FORMAT).map_err(|_| invalid())?;
    if date_key(date) != value {
        return Err(invalid());
    }
    Ok(date)
}
