use super::{StateStorage, found, listed, saved, validate_snapshot, validate_world_id};
use crate::snapshot::WorldSnapshot;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Process-local store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    snapshots: RwLock<BTreeMap<(String, NaiveDate), WorldSnapshot>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots across all worlds.
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl StateStorage for InMemoryStorage {
    fn save(&self, snapshot: &WorldSnapshot) -> bool {
        let stored = validate_snapshot(snapshot).map(|()| {
            self.snapshots.write().insert(
                (snapshot.world_id.clone(), snapshot.simulation_date),
                snapshot.clone(),
            );
        });
        saved(stored, snapshot)
    }

    fn load(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot> {
        let lookup = validate_world_id(world_id).map(|()| {
            self.snapshots
                .read()
                .get(&(world_id.to_string(), date))
                .cloned()
        });
        found(lookup, world_id, "load")
    }

    fn latest_before(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot> {
        let lookup = validate_world_id(world_id).map(|()| {
            let key = world_id.to_string();
            self.snapshots
                .read()
                .range((
                    Bound::Included((key.clone(), NaiveDate::MIN)),
                    Bound::Excluded((key, date)),
                ))
                .next_back()
                .map(|(_, snapshot)| snapshot.clone())
        });
        found(lookup, world_id, "latest_before")
    }

    fn list_dates(&self, world_id: &str) -> Vec<NaiveDate> {
        let dates = validate_world_id(world_id).map(|()| {
            self.snapshots
                .read()
                .keys()
                .filter(|(id, _)| id == world_id)
                .map(|(_, date)| *date)
                .collect()
        });
        listed(dates, world_id)
    }
}
