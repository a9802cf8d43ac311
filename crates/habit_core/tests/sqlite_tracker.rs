use chrono::NaiveDate;
use habit_core::{
    Habit, HabitId, HabitRepository, NavigationIntent, ProgressRecord, ProgressRepository,
    RepoError, SqliteTrackerRepository, Tier, TrackerService, YearMonth,
};
use std::collections::BTreeSet;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn id(value: &str) -> HabitId {
    HabitId::new(value).unwrap()
}

#[test]
fn habits_round_trip_in_insertion_order() {
    let repo = SqliteTrackerRepository::open_in_memory().unwrap();
    let first = Habit::with_id(id("h1"), "stretch", [5, 1, 3]).unwrap();
    let second = Habit::with_id(id("h2"), "journal", [0]).unwrap();

    repo.create_habit(&first).unwrap();
    repo.create_habit(&second).unwrap();

    let records = repo.list_habits().unwrap();
    let ids: Vec<&str> = records.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["h1", "h2"]);
    assert_eq!(records[0].recurrence, vec![1, 3, 5]);
    assert_eq!(records[1].name, "journal");
}

#[test]
fn listing_follows_insertion_even_when_timestamps_disagree() {
    let repo = SqliteTrackerRepository::open_in_memory().unwrap();
    // Clock skew or an import can stamp a row later than the rows after it.
    repo.connection()
        .execute(
            "INSERT INTO habits (id, name, recurrence, created_at)
             VALUES ('early', 'imported', '1', 9999999999999);",
            [],
        )
        .unwrap();
    for n in 0..5 {
        let habit = Habit::with_id(id(&format!("h{n}")), format!("habit {n}"), [1]).unwrap();
        repo.create_habit(&habit).unwrap();
    }

    let ids: Vec<String> = repo
        .list_habits()
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ids, vec!["early", "h0", "h1", "h2", "h3", "h4"]);

    let stamped: i64 = repo
        .connection()
        .query_row("SELECT created_at FROM habits WHERE id = 'h0';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert!(stamped > 1_000_000_000_000, "created_at should be milliseconds");
}

#[test]
fn duplicate_habit_id_is_reported() {
    let repo = SqliteTrackerRepository::open_in_memory().unwrap();
    let habit = Habit::with_id(id("h1"), "stretch", [1]).unwrap();
    repo.create_habit(&habit).unwrap();

    let err = repo.create_habit(&habit).unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(dup) if dup == id("h1")));
}

#[test]
fn deleting_missing_habit_is_not_found() {
    let repo = SqliteTrackerRepository::open_in_memory().unwrap();
    let err = repo.delete_habit(&id("ghost")).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[test]
fn progress_save_replaces_completion_set() {
    let repo = SqliteTrackerRepository::open_in_memory().unwrap();
    let first = ProgressRecord {
        percent: 100.0,
        completed_ids: [id("h1"), id("h2")].into_iter().collect(),
    };
    let second = ProgressRecord {
        percent: 50.0,
        completed_ids: [id("h2")].into_iter().collect(),
    };

    repo.save_progress(monday(), &first).unwrap();
    repo.save_progress(monday(), &second).unwrap();

    assert_eq!(repo.load_progress().unwrap(), vec![(monday(), second)]);
}

#[test]
fn empty_progress_record_is_stored() {
    let repo = SqliteTrackerRepository::open_in_memory().unwrap();
    repo.save_progress(monday(), &ProgressRecord::default())
        .unwrap();

    let loaded = repo.load_progress().unwrap();
    assert_eq!(loaded, vec![(monday(), ProgressRecord::default())]);
}

#[test]
fn completions_survive_habit_deletion() {
    let repo = SqliteTrackerRepository::open_in_memory().unwrap();
    let habit = Habit::with_id(id("h1"), "stretch", [1]).unwrap();
    repo.create_habit(&habit).unwrap();
    let record = ProgressRecord {
        percent: 100.0,
        completed_ids: [id("h1")].into_iter().collect(),
    };
    repo.save_progress(monday(), &record).unwrap();

    repo.delete_habit(&habit.id).unwrap();

    assert!(repo.list_habits().unwrap().is_empty());
    assert_eq!(repo.load_progress().unwrap(), vec![(monday(), record)]);
}

#[test]
fn garbage_recurrence_row_is_rejected_at_refresh() {
    let repo = SqliteTrackerRepository::open_in_memory().unwrap();
    repo.connection()
        .execute(
            "INSERT INTO habits (id, name, recurrence) VALUES ('bad', 'broken', 'mon,wed');",
            [],
        )
        .unwrap();
    repo.create_habit(&Habit::with_id(id("ok"), "fine", [1]).unwrap())
        .unwrap();

    let mut service = TrackerService::new(repo);
    let report = service.refresh().unwrap();
    assert_eq!(report.habits, 1);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].id, "bad");
}

#[test]
fn file_backed_tracker_restores_progress_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.sqlite3");

    {
        let mut service = TrackerService::new(SqliteTrackerRepository::open(&path).unwrap());
        service.refresh().unwrap();
        let stretch = service.create_habit("stretch", &[1, 3, 5]).unwrap();
        service.create_habit("journal", &[1]).unwrap();

        service.select_day(monday()).unwrap();
        service.toggle(&stretch.id).unwrap();
        service.go_back();
        assert_eq!(service.unsynced_dates().count(), 0);
    }

    let mut service = TrackerService::new(SqliteTrackerRepository::open(&path).unwrap());
    let report = service.refresh().unwrap();
    assert_eq!(report.habits, 2);
    assert_eq!(report.progress_records, 1);

    let grid = service
        .month_grid(YearMonth::of(monday()).unwrap(), monday())
        .unwrap();
    let cell = grid.cell_for(monday()).unwrap();
    assert_eq!(cell.percent(), 50.0);
    assert_eq!(cell.tier(), Tier::Mid);

    let NavigationIntent::OpenDay { prior, .. } = service.select_day(monday()).unwrap() else {
        panic!("expected OpenDay intent");
    };
    let stretch_id = service.habits()[0].id.clone();
    let expected: BTreeSet<HabitId> = [stretch_id].into_iter().collect();
    assert_eq!(prior.completed_ids, expected);
}
