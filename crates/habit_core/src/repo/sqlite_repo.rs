//! SQLite implementation of the habit and progress repositories.
//!
//! # Responsibility
//! - Persist habit definitions and per-date progress records.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Habits are listed in insertion order (`rowid`), independent of
//!   `created_at`.
//! - `created_at` holds Unix milliseconds taken at insert time.
//! - `save_progress` replaces the record and its completed-id set in one
//!   transaction.
//! - Completed ids are stored without a foreign key to `habits`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::calendar::{date_key, parse_date_key};
use crate::model::habit::{Habit, HabitId, HabitRecord};
use crate::model::progress::ProgressRecord;
use crate::repo::{HabitRepository, ProgressRepository, RepoError, RepoResult};
use chrono::{NaiveDate, Utc};
use log::warn;
use rusqlite::{params, Connection, ErrorCode};
use std::collections::BTreeMap;
use std::path::Path;

/// Repository over one migrated SQLite connection.
#[derive(Debug)]
pub struct SqliteTrackerRepository {
    conn: Connection,
}

impl SqliteTrackerRepository {
    /// Wraps a connection whose schema is already at the latest version.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        let db_version = current_user_version(&conn)?;
        let expected = latest_version();
        if db_version != expected {
            return Err(DbError::SchemaNotReady {
                db_version,
                expected,
            }
            .into());
        }
        Ok(Self { conn })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl HabitRepository for SqliteTrackerRepository {
    fn list_habits(&self) -> RepoResult<Vec<HabitRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, recurrence
             FROM habits
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let recurrence_text: String = row.get("recurrence")?;
            records.push(HabitRecord {
                recurrence: parse_recurrence_text(&id, &recurrence_text),
                name: row.get("name")?,
                id,
            });
        }

        Ok(records)
    }

    fn create_habit(&self, habit: &Habit) -> RepoResult<HabitId> {
        let result = self.conn.execute(
            "INSERT INTO habits (id, name, recurrence, created_at) VALUES (?1, ?2, ?3, ?4);",
            params![
                habit.id.as_str(),
                habit.name.as_str(),
                recurrence_to_text(habit),
                Utc::now().timestamp_millis(),
            ],
        );

        match result {
            Ok(_) => Ok(habit.id.clone()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepoError::Duplicate(habit.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete_habit(&self, id: &HabitId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?1;", [id.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.clone()));
        }
        Ok(())
    }
}

impl ProgressRepository for SqliteTrackerRepository {
    fn load_progress(&self) -> RepoResult<Vec<(NaiveDate, ProgressRecord)>> {
        let mut records: BTreeMap<NaiveDate, ProgressRecord> = BTreeMap::new();

        let mut stmt = self
            .conn
            .prepare("SELECT date_key, percent FROM progress ORDER BY date_key ASC;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let date = parse_stored_date(&row.get::<_, String>("date_key")?)?;
            records.insert(
                date,
                ProgressRecord {
                    percent: row.get("percent")?,
                    completed_ids: Default::default(),
                },
            );
        }

        let mut stmt = self.conn.prepare(
            "SELECT date_key, habit_id
             FROM progress_completions
             ORDER BY date_key ASC, habit_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let date = parse_stored_date(&row.get::<_, String>("date_key")?)?;
            let habit_text: String = row.get("habit_id")?;
            let habit_id = HabitId::new(habit_text.as_str()).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid habit id `{habit_text}` in progress_completions.habit_id"
                ))
            })?;
            if let Some(record) = records.get_mut(&date) {
                record.completed_ids.insert(habit_id);
            }
        }

        Ok(records.into_iter().collect())
    }

    fn save_progress(&self, date: NaiveDate, record: &ProgressRecord) -> RepoResult<()> {
        let key = date_key(date);
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO progress (date_key, percent)
             VALUES (?1, ?2)
             ON CONFLICT (date_key) DO UPDATE SET
                percent = excluded.percent,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, record.percent],
        )?;
        tx.execute(
            "DELETE FROM progress_completions WHERE date_key = ?1;",
            [key.as_str()],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO progress_completions (date_key, habit_id) VALUES (?1, ?2);",
            )?;
            for habit_id in &record.completed_ids {
                insert.execute(params![key, habit_id.as_str()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn recurrence_to_text(habit: &Habit) -> String {
    habit
        .recurrence
        .weekdays()
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

// Unparsable text yields an empty rule so ingestion rejects the row.
fn parse_recurrence_text(habit_id: &str, value: &str) -> Vec<i64> {
    let parsed: Result<Vec<i64>, _> = value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::parse::<i64>)
        .collect();
    parsed.unwrap_or_else(|_| {
        warn!("event=habit_read module=repo status=invalid habit_id={habit_id} field=recurrence");
        Vec::new()
    })
}

fn parse_stored_date(value: &str) -> RepoResult<NaiveDate> {
    parse_date_key(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid date key `{value}` in progress.date_key"))
    })
}
