#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use persistent_world::clock::BusinessTimeManager;
use persistent_world::event::Event;
use persistent_world::profile::WorldType;
use persistent_world::snapshot::WorldSnapshot;
use persistent_world::storage::{SqliteStateStorage, StateStorage};
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn snapshot(world_id: &str, date: NaiveDate) -> WorldSnapshot {
    let mut clock = BusinessTimeManager::new(date);
    clock.schedule_event(date, Event::meeting("Planning", 60));
    WorldSnapshot::new(world_id, WorldType::Research, date, clock.save_state())
}

#[test]
fn sqlite_store_round_trip_snapshot() {
    let file = NamedTempFile::new().unwrap();
    let store = SqliteStateStorage::new(file.path()).unwrap();

    let original = snapshot("lab", d(2024, 7, 1));
    assert!(store.save(&original));

    let loaded = store.load("lab", d(2024, 7, 1)).expect("snapshot exists");
    assert_eq!(loaded, original);
    assert_eq!(loaded.clock_state.daily_events[&d(2024, 7, 1)].len(), 1);
}

#[test]
fn sqlite_store_upserts_and_orders_dates() {
    let store = SqliteStateStorage::in_memory().unwrap();
    for date in [d(2024, 7, 3), d(2024, 7, 1), d(2024, 7, 2)] {
        assert!(store.save(&snapshot("lab", date)));
    }
    let mut again = snapshot("lab", d(2024, 7, 2));
    again.notes = "rerun".into();
    assert!(store.save(&again));

    assert_eq!(
        store.list_dates("lab"),
        vec![d(2024, 7, 1), d(2024, 7, 2), d(2024, 7, 3)]
    );
    assert_eq!(store.load("lab", d(2024, 7, 2)).unwrap().notes, "rerun");
}

#[test]
fn sqlite_latest_before_is_strict() {
    let store = SqliteStateStorage::in_memory().unwrap();
    assert!(store.save(&snapshot("lab", d(2024, 7, 1))));
    assert!(store.save(&snapshot("lab", d(2024, 7, 3))));
    assert!(store.save(&snapshot("other", d(2024, 7, 2))));

    let previous = store.latest_before("lab", d(2024, 7, 3)).unwrap();
    assert_eq!(previous.simulation_date, d(2024, 7, 1));
    assert!(store.latest_before("lab", d(2024, 7, 1)).is_none());
    assert!(store.latest_before("missing", d(2024, 7, 9)).is_none());
}

#[test]
fn sqlite_store_persists_across_connections() {
    let file = NamedTempFile::new().unwrap();
    {
        let store = SqliteStateStorage::new(file.path()).unwrap();
        assert!(store.save(&snapshot("lab", d(2024, 7, 1))));
    }
    let reopened = SqliteStateStorage::new(file.path()).unwrap();
    assert_eq!(reopened.list_dates("lab"), vec![d(2024, 7, 1)]);
    assert!(!reopened.save(&snapshot("bad id", d(2024, 7, 2))));
}

#[test]
fn sqlite_store_rejects_unreadable_numbers() {
    let store = SqliteStateStorage::in_memory().unwrap();

    let mut clock = BusinessTimeManager::new(d(2024, 7, 2));
    clock.advance_time(7.0 / 60.0);
    let exact = WorldSnapshot::new("lab", WorldType::Research, d(2024, 7, 2), clock.save_state());
    assert!(store.save(&exact));
    let loaded = store.load("lab", d(2024, 7, 2)).expect("snapshot exists");
    assert_eq!(
        loaded.clock_state.total_hours.to_bits(),
        exact.clock_state.total_hours.to_bits()
    );

    let mut broken = snapshot("lab", d(2024, 7, 3));
    broken.metrics.insert("productivity_score".into(), f64::NEG_INFINITY);
    assert!(!store.save(&broken));
    assert_eq!(store.list_dates("lab"), vec![d(2024, 7, 2)]);
}
