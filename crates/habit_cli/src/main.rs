//! Command-line front end for the habit tracker.
//!
//! # Responsibility
//! - Drive the same tracker service the Flutter shell uses, against a
//!   local SQLite file.
//! - Render the month summary as a plain-text grid.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use habit_core::{
    default_log_level, init_logging, parse_date_key, DaySession, DeleteConfirmation, HabitId,
    MonthGrid, SqliteTrackerRepository, Tier, TrackerService, YearMonth,
};
use log::info;
use std::path::PathBuf;

const DB_FILE_NAME: &str = "habits.sqlite3";
const WEEKDAY_HEADER: &str = "  Su   Mo   Tu   We   Th   Fr   Sa";

#[derive(Parser, Debug)]
#[command(author, version, about = "habit: weekly habits and daily progress", long_about = None)]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "HABITS_DB_PATH")]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a habit recurring on the given weekdays.
    #[command(after_help = "EXAMPLES:\n    # Monday, Wednesday and Friday\n    habit add stretch --days 1,3,5")]
    Add {
        name: String,
        /// Weekday indices, 0 = Sunday .. 6 = Saturday.
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<i64>,
    },
    /// List habits.
    List,
    /// Show the month summary grid.
    Month {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Show the checklist for one date (YYYY-MM-DD).
    Day { date: String },
    /// Flip one habit's done flag on a date.
    Toggle { date: String, habit_id: String },
    /// Permanently delete a habit occurring on a date.
    Delete {
        date: String,
        habit_id: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(DB_FILE_NAME));
    let repo = SqliteTrackerRepository::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let mut tracker = TrackerService::new(repo);
    let report = tracker.refresh().context("failed to load habits")?;
    for rejected in &report.rejected {
        eprintln!("skipping invalid habit {}: {}", rejected.id, rejected.reason);
    }

    run(&mut tracker, cli.command)?;

    let pending = tracker.unsynced_dates().count();
    if pending > 0 {
        tracker
            .flush_progress()
            .context("progress was updated but could not be saved")?;
    }
    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let Some(log_dir) = &cli.log_dir else {
        return Ok(());
    };
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().as_str().to_string());
    let log_dir = log_dir
        .to_str()
        .context("log directory must be valid UTF-8")?;
    init_logging(&level, log_dir).context("failed to initialize logging")?;
    info!("event=cli_start module=cli status=ok");
    Ok(())
}

fn run(tracker: &mut TrackerService<SqliteTrackerRepository>, command: Commands) -> Result<()> {
    match command {
        Commands::Add { name, days } => {
            let habit = tracker
                .create_habit(&name, &days)
                .context("failed to create habit")?;
            println!("{}  {}", habit.id, habit.name);
        }
        Commands::List => {
            if tracker.habits().is_empty() {
                println!("no habits");
            }
            for habit in tracker.habits() {
                println!(
                    "{}  {}  [{}]",
                    habit.id,
                    habit.name,
                    weekday_labels(&habit.recurrence.weekdays())
                );
            }
        }
        Commands::Month { year, month } => {
            let today = Local::now().date_naive();
            let target = YearMonth::new(
                year.unwrap_or_else(|| today.year()),
                month.unwrap_or_else(|| today.month()),
            )?;
            let grid = tracker.month_grid(target, today)?;
            print!("{}", render_grid(&grid));
        }
        Commands::Day { date } => {
            let date = parse_date(&date)?;
            tracker.select_day(date)?;
            print_session(tracker)?;
        }
        Commands::Toggle { date, habit_id } => {
            let date = parse_date(&date)?;
            let habit_id = HabitId::new(habit_id)?;
            tracker.select_day(date)?;
            tracker.toggle(&habit_id)?;
            print_session(tracker)?;
        }
        Commands::Delete {
            date,
            habit_id,
            yes,
        } => {
            if !yes {
                bail!("refusing to delete without --yes");
            }
            let date = parse_date(&date)?;
            let habit_id = HabitId::new(habit_id)?;
            tracker.select_day(date)?;
            tracker.delete_habit(&habit_id, DeleteConfirmation::confirm(habit_id.clone()))?;
            println!("deleted {habit_id}");
            if !tracker.active_session().is_some_and(|s| s.tasks().is_empty()) {
                print_session(tracker)?;
            }
        }
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    parse_date_key(value).with_context(|| format!("invalid date `{value}`"))
}

fn print_session(tracker: &TrackerService<SqliteTrackerRepository>) -> Result<()> {
    let session = tracker
        .active_session()
        .context("no day is open")?;
    print!("{}", render_session(session));
    Ok(())
}

fn render_session(session: &DaySession) -> String {
    let mut out = format!("{}  {:.0}%\n", session.date(), session.percent());
    for task in session.tasks() {
        let mark = if task.done { 'x' } else { ' ' };
        out.push_str(&format!("[{mark}] {}  {}\n", task.habit_id, task.name));
    }
    out
}

fn render_grid(grid: &MonthGrid) -> String {
    let mut out = format!("{}\n{WEEKDAY_HEADER}\n", grid.month);
    for row in grid.rows() {
        for cell in row {
            if !cell.in_current_month {
                out.push_str("     ");
                continue;
            }
            let today = if cell.emphasized() { '*' } else { ' ' };
            out.push_str(&format!(
                " {:>2}{}{}",
                cell.date.day(),
                tier_glyph(cell.tier()),
                today
            ));
        }
        out.push('\n');
    }
    out
}

fn tier_glyph(tier: Tier) -> char {
    match tier {
        Tier::Empty => ' ',
        Tier::NotStarted => '.',
        Tier::Low => '-',
        Tier::Mid => '=',
        Tier::High => '#',
        Tier::Complete => '@',
    }
}

fn weekday_labels(weekdays: &[u8]) -> String {
    const LABELS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
    weekdays
        .iter()
        .filter_map(|day| LABELS.get(usize::from(*day)).copied())
        .collect::<Vec<_>>()
        .join(",")
}
