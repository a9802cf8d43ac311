//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the month summary and day detail flows to Dart via FRB.
//! - Own the single process-wide tracker session behind a mutex.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every fallible call returns an envelope with `ok` and `message`.
//! - The database path is fixed once the tracker has been opened.

use chrono::{Local, NaiveDate};
use habit_core::{
    core_version as core_version_inner, date_key, init_logging as init_logging_inner,
    parse_date_key, ping as ping_inner, style_for, DayCell, DaySession, DeleteConfirmation, Habit,
    HabitId, SqliteTrackerRepository, TrackerService, YearMonth,
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

const DB_PATH_ENV: &str = "HABITS_DB_PATH";
const DB_FILE_NAME: &str = "habits.sqlite3";

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static TRACKER: Mutex<Option<TrackerService<SqliteTrackerRepository>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Pins the SQLite file used by every tracker call.
///
/// Must run before the first tracker call. Repeating the same path is a
/// no-op; a different path after the first one returns an error message.
/// Returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = DB_PATH.get_or_init(|| requested.clone());
    if *active != requested {
        return format!(
            "db_path already set to `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        );
    }
    String::new()
}

/// Habit projection for list and create responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitItem {
    pub habit_id: String,
    pub name: String,
    /// Ascending weekday indices, 0 = Sunday.
    pub weekdays: Vec<u8>,
}

impl From<&Habit> for HabitItem {
    fn from(habit: &Habit) -> Self {
        Self {
            habit_id: habit.id.to_string(),
            name: habit.name.clone(),
            weekdays: habit.recurrence.weekdays(),
        }
    }
}

/// Response envelope for habit create/list calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitListResponse {
    pub ok: bool,
    pub items: Vec<HabitItem>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl HabitListResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            items: Vec::new(),
            message: message.into(),
        }
    }
}

/// One square of the month summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCellItem {
    pub date_key: String,
    pub in_current_month: bool,
    pub occurs: bool,
    pub percent: f64,
    /// `empty|not_started|low|mid|high|complete`.
    pub tier: String,
    /// Today inside the displayed month.
    pub emphasized: bool,
    /// Whether tapping the cell may open the day detail.
    pub interactive: bool,
}

impl From<&DayCell> for DayCellItem {
    fn from(cell: &DayCell) -> Self {
        let style = style_for(cell);
        Self {
            date_key: date_key(cell.date),
            in_current_month: cell.in_current_month,
            occurs: cell.occurs,
            percent: cell.percent(),
            tier: style.tier.as_str().to_string(),
            emphasized: style.emphasized,
            interactive: cell.is_interactive(),
        }
    }
}

/// Month summary response; `cells.len()` is a multiple of 7.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGridResponse {
    pub ok: bool,
    pub year: i32,
    pub month: u32,
    pub cells: Vec<DayCellItem>,
    pub message: String,
}

/// One checklist row in the day detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTaskItem {
    pub habit_id: String,
    pub name: String,
    pub done: bool,
}

/// Day detail response returned by open/toggle/delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DayResponse {
    pub ok: bool,
    pub date_key: String,
    pub tasks: Vec<DayTaskItem>,
    pub percent: f64,
    pub message: String,
}

impl DayResponse {
    fn from_session(session: &DaySession, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            date_key: date_key(session.date()),
            tasks: session
                .tasks()
                .iter()
                .map(|task| DayTaskItem {
                    habit_id: task.habit_id.to_string(),
                    name: task.name.clone(),
                    done: task.done,
                })
                .collect(),
            percent: session.percent(),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            date_key: String::new(),
            tasks: Vec::new(),
            percent: 0.0,
            message: message.into(),
        }
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
}

/// Creates a habit recurring on `weekdays` (0 = Sunday .. 6 = Saturday).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - On success `items` holds only the created habit.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_create(name: String, weekdays: Vec<i32>) -> HabitListResponse {
    let weekdays: Vec<i64> = weekdays.into_iter().map(i64::from).collect();
    let result = with_tracker(|tracker| {
        tracker
            .create_habit(name.as_str(), &weekdays)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(habit) => HabitListResponse {
            ok: true,
            items: vec![HabitItem::from(&habit)],
            message: "Habit created.".to_string(),
        },
        Err(err) => HabitListResponse::failure(format!("habit_create failed: {err}")),
    }
}

/// Lists every valid habit after reloading from storage.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_list() -> HabitListResponse {
    let result = with_tracker(|tracker| {
        let report = tracker.refresh().map_err(|err| err.to_string())?;
        let items = tracker.habits().iter().map(HabitItem::from).collect();
        Ok((items, report.rejected.len()))
    });
    match result {
        Ok((items, rejected)) => HabitListResponse {
            ok: true,
            items,
            message: if rejected == 0 {
                "ok".to_string()
            } else {
                format!("{rejected} invalid habit record(s) skipped")
            },
        },
        Err(err) => HabitListResponse::failure(format!("habit_list failed: {err}")),
    }
}

/// Builds the month summary for `year`/`month` (1-12) against local today.
#[flutter_rust_bridge::frb(sync)]
pub fn month_grid(year: i32, month: u32) -> MonthGridResponse {
    let failure = |message: String| MonthGridResponse {
        ok: false,
        year,
        month,
        cells: Vec::new(),
        message,
    };
    let target = match YearMonth::new(year, month) {
        Ok(target) => target,
        Err(err) => return failure(format!("month_grid failed: {err}")),
    };

    let today = local_today();
    match with_tracker(|tracker| {
        tracker
            .month_grid(target, today)
            .map_err(|err| err.to_string())
    }) {
        Ok(grid) => MonthGridResponse {
            ok: true,
            year,
            month,
            cells: grid.cells.iter().map(DayCellItem::from).collect(),
            message: "ok".to_string(),
        },
        Err(err) => failure(format!("month_grid failed: {err}")),
    }
}

/// Opens the day detail for `date_key` (`YYYY-MM-DD`).
///
/// Replaces any open day. Fails when no habit occurs that date.
#[flutter_rust_bridge::frb(sync)]
pub fn day_open(date_key: String) -> DayResponse {
    let date = match parse_date_key(date_key.as_str()) {
        Ok(date) => date,
        Err(err) => return DayResponse::failure(format!("day_open failed: {err}")),
    };
    day_call("day_open", |tracker| {
        tracker.select_day(date).map_err(|err| err.to_string())?;
        Ok("Day opened.")
    })
}

/// Toggles one habit in the open day.
#[flutter_rust_bridge::frb(sync)]
pub fn day_toggle(habit_id: String) -> DayResponse {
    let habit_id = match HabitId::new(habit_id) {
        Ok(id) => id,
        Err(err) => return DayResponse::failure(format!("day_toggle failed: {err}")),
    };
    day_call("day_toggle", |tracker| {
        tracker.toggle(&habit_id).map_err(|err| err.to_string())?;
        Ok("Progress updated.")
    })
}

/// Permanently deletes a habit listed in the open day.
///
/// `confirmed` carries the user's answer to the confirmation prompt;
/// `false` is refused without touching storage.
#[flutter_rust_bridge::frb(sync)]
pub fn day_delete(habit_id: String, confirmed: bool) -> DayResponse {
    if !confirmed {
        return DayResponse::failure("day_delete refused: deletion was not confirmed");
    }
    let habit_id = match HabitId::new(habit_id) {
        Ok(id) => id,
        Err(err) => return DayResponse::failure(format!("day_delete failed: {err}")),
    };
    day_call("day_delete", |tracker| {
        let confirmation = DeleteConfirmation::confirm(habit_id.clone());
        tracker
            .delete_habit(&habit_id, confirmation)
            .map_err(|err| err.to_string())?;
        Ok("Habit deleted.")
    })
}

/// Closes the open day detail, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn day_close() -> ActionResponse {
    match with_tracker(|tracker| Ok(tracker.go_back())) {
        Ok(Some(closed)) => ActionResponse {
            ok: true,
            message: format!("Closed {}.", date_key(closed.date)),
        },
        Ok(None) => ActionResponse {
            ok: true,
            message: "No day was open.".to_string(),
        },
        Err(err) => ActionResponse {
            ok: false,
            message: format!("day_close failed: {err}"),
        },
    }
}

fn day_call(
    operation: &str,
    f: impl FnOnce(&mut TrackerService<SqliteTrackerRepository>) -> Result<&'static str, String>,
) -> DayResponse {
    let result = with_tracker(|tracker| {
        let message = f(tracker)?;
        let session = tracker
            .active_session()
            .ok_or_else(|| "no day is open".to_string())?;
        Ok(DayResponse::from_session(session, message))
    });
    result.unwrap_or_else(|err| DayResponse::failure(format!("{operation} failed: {err}")))
}

fn with_tracker<T>(
    f: impl FnOnce(&mut TrackerService<SqliteTrackerRepository>) -> Result<T, String>,
) -> Result<T, String> {
    let mut guard = lock_tracker();
    if guard.is_none() {
        *guard = Some(open_tracker()?);
    }
    match guard.as_mut() {
        Some(tracker) => f(tracker),
        None => Err("tracker unavailable".to_string()),
    }
}

fn lock_tracker() -> MutexGuard<'static, Option<TrackerService<SqliteTrackerRepository>>> {
    TRACKER.lock().unwrap_or_else(|poisoned| {
        warn!("event=tracker_lock module=ffi status=recovered");
        PoisonError::into_inner(poisoned)
    })
}

fn open_tracker() -> Result<TrackerService<SqliteTrackerRepository>, String> {
    let db_path = resolve_db_path();
    let repo = SqliteTrackerRepository::open(&db_path)
        .map_err(|err| format!("tracker DB open failed: {err}"))?;
    let mut tracker = TrackerService::new(repo);
    let report = tracker
        .refresh()
        .map_err(|err| format!("tracker load failed: {err}"))?;
    info!(
        "event=tracker_open module=ffi status=ok habits={} rejected={}",
        report.habits,
        report.rejected.len()
    );
    Ok(tracker)
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
