use chrono::NaiveDate;
use persistent_world::clock::BusinessTimeManager;
use persistent_world::profile::WorldType;
use persistent_world::snapshot::{OpaqueState, WorldSnapshot};
use persistent_world::storage::{InMemoryStorage, JsonFileStorage, StateStorage};
use std::collections::BTreeMap;
use tempfile::tempdir;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn snapshot(world_id: &str, date: NaiveDate) -> WorldSnapshot {
    let clock = BusinessTimeManager::new(date);
    let mut snapshot = WorldSnapshot::new(world_id, WorldType::Business, date, clock.save_state());
    snapshot.metrics = BTreeMap::from([("total_simulation_days".to_string(), 1.0)]);
    snapshot.directory_state = OpaqueState {
        version: 1,
        payload: r#"{"members":{}}"#.into(),
    };
    snapshot
}

fn exercise_contract(storage: &dyn StateStorage) {
    for date in [d(2024, 7, 5), d(2024, 7, 1), d(2024, 7, 3)] {
        assert!(storage.save(&snapshot("acme", date)));
    }
    assert!(storage.save(&snapshot("globex", d(2024, 7, 2))));

    assert_eq!(
        storage.list_dates("acme"),
        vec![d(2024, 7, 1), d(2024, 7, 3), d(2024, 7, 5)]
    );
    assert_eq!(storage.list_dates("globex"), vec![d(2024, 7, 2)]);
    assert!(storage.list_dates("initech").is_empty());

    let loaded = storage.load("acme", d(2024, 7, 3)).unwrap();
    assert_eq!(loaded, snapshot_with_time(&loaded, "acme", d(2024, 7, 3)));
    assert!(storage.load("acme", d(2024, 7, 2)).is_none());

    // strictly before
    let previous = storage.latest_before("acme", d(2024, 7, 5)).unwrap();
    assert_eq!(previous.simulation_date, d(2024, 7, 3));
    let previous = storage.latest_before("acme", d(2024, 7, 4)).unwrap();
    assert_eq!(previous.simulation_date, d(2024, 7, 3));
    assert!(storage.latest_before("acme", d(2024, 7, 1)).is_none());
    assert_eq!(
        storage
            .latest_before("acme", d(2030, 1, 1))
            .map(|s| s.simulation_date),
        Some(d(2024, 7, 5))
    );

    let mut replacement = snapshot("acme", d(2024, 7, 3));
    replacement.notes = "second attempt".into();
    assert!(storage.save(&replacement));
    assert_eq!(storage.load("acme", d(2024, 7, 3)).unwrap().notes, "second attempt");
    assert_eq!(storage.list_dates("acme").len(), 3);

    // rejected alike by every backend
    assert!(!storage.save(&snapshot("acme corp", d(2024, 7, 1))));
    assert!(storage.load("acme corp", d(2024, 7, 1)).is_none());
    assert!(storage.latest_before("acme corp", d(2024, 7, 2)).is_none());
    assert!(storage.list_dates("acme corp").is_empty());

    let mut unreadable = snapshot("acme", d(2024, 7, 8));
    unreadable
        .metrics
        .insert("productivity_score".into(), f64::NAN);
    assert!(!storage.save(&unreadable));
    let mut runaway = snapshot("acme", d(2024, 7, 8));
    runaway.clock_state.speed = f64::INFINITY;
    assert!(!storage.save(&runaway));
    assert_eq!(
        storage
            .latest_before("acme", d(2024, 7, 9))
            .map(|s| s.simulation_date),
        Some(d(2024, 7, 5))
    );
}

/// Same snapshot as `snapshot()` but with the stored creation time.
fn snapshot_with_time(stored: &WorldSnapshot, world_id: &str, date: NaiveDate) -> WorldSnapshot {
    let mut expected = snapshot(world_id, date);
    expected.created_at = stored.created_at;
    expected
}

#[test]
fn memory_storage_honours_contract() {
    let storage = InMemoryStorage::new();
    exercise_contract(&storage);
    assert_eq!(storage.len(), 4);
}

#[test]
fn json_storage_honours_contract() {
    let dir = tempdir().unwrap();
    let storage = JsonFileStorage::new(dir.path()).unwrap();
    exercise_contract(&storage);
    assert!(dir.path().join("acme_2024-07-01.json").exists());
    assert!(!dir.path().join("acme_2024-07-01.json.tmp").exists());
}

#[test]
fn json_storage_keeps_prefixed_world_ids_apart() {
    let dir = tempdir().unwrap();
    let storage = JsonFileStorage::new(dir.path()).unwrap();
    assert!(storage.save(&snapshot("acme", d(2024, 7, 1))));
    assert!(storage.save(&snapshot("acme_eu", d(2024, 7, 2))));

    assert_eq!(storage.list_dates("acme"), vec![d(2024, 7, 1)]);
    assert_eq!(storage.list_dates("acme_eu"), vec![d(2024, 7, 2)]);
}

#[test]
fn json_storage_reports_failures_as_values() {
    let dir = tempdir().unwrap();
    let storage = JsonFileStorage::new(dir.path()).unwrap();

    assert!(!storage.save(&snapshot("../escape", d(2024, 7, 1))));
    assert!(storage.list_dates("../escape").is_empty());

    std::fs::write(dir.path().join("acme_2024-07-01.json"), "{ not json").unwrap();
    assert!(storage.load("acme", d(2024, 7, 1)).is_none());
    assert!(storage.latest_before("acme", d(2024, 7, 2)).is_none());
    assert_eq!(storage.list_dates("acme"), vec![d(2024, 7, 1)]);
}

#[test]
fn json_storage_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let storage = JsonFileStorage::new(dir.path()).unwrap();
        assert!(storage.save(&snapshot("acme", d(2024, 7, 1))));
    }
    let reopened = JsonFileStorage::new(dir.path()).unwrap();
    let loaded = reopened.load("acme", d(2024, 7, 1)).unwrap();
    assert_eq!(loaded.world_type, WorldType::Business);
    assert_eq!(loaded.directory_state.version, 1);
    assert!(loaded.is_consistent());
}

#[test]
fn json_storage_keeps_fractional_hours_exact() {
    let dir = tempdir().unwrap();
    let storage = JsonFileStorage::new(dir.path()).unwrap();

    let mut clock = BusinessTimeManager::new(d(2024, 7, 2));
    assert!(clock.advance_time(7.0 / 60.0));
    let mut original = WorldSnapshot::new("acme", WorldType::Business, d(2024, 7, 2), clock.save_state());
    original.metrics = BTreeMap::from([("productivity_score".to_string(), 2.0 / 3.0)]);
    assert!(storage.save(&original));

    let loaded = storage.load("acme", d(2024, 7, 2)).unwrap();
    assert_eq!(
        loaded.clock_state.total_hours.to_bits(),
        clock.total_hours().to_bits()
    );
    assert_eq!(
        loaded.metrics["productivity_score"].to_bits(),
        (2.0f64 / 3.0).to_bits()
    );
}

#[test]
fn json_storage_cleans_up_after_failed_write() {
    let dir = tempdir().unwrap();
    let storage = JsonFileStorage::new(dir.path()).unwrap();
    // a directory squatting on the target name makes the final rename fail
    std::fs::create_dir(dir.path().join("acme_2024-07-01.json")).unwrap();

    assert!(!storage.save(&snapshot("acme", d(2024, 7, 1))));
    assert!(!dir.path().join("acme_2024-07-01.json.tmp").exists());
}
