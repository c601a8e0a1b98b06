//! Durable snapshot stores keyed by `(world_id, simulation_date)`.
//!
//! Every backend keeps the same contract: failures are logged and surface as
//! `false` / `None` / an empty list so a multi-day run can skip one bad day
//! without aborting.

use crate::error::{StorageError, StorageResult};
use crate::snapshot::WorldSnapshot;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::error;

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::JsonFileStorage;
pub use memory::InMemoryStorage;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStateStorage;

pub trait StateStorage {
    /// Overwrites any snapshot already stored under the same key.
    fn save(&self, snapshot: &WorldSnapshot) -> bool;

    /// Snapshot stored for exactly `date`.
    fn load(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot>;

    /// Snapshot with the greatest date strictly before `date`.
    fn latest_before(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot>;

    /// Stored dates, ascending.
    fn list_dates(&self, world_id: &str) -> Vec<NaiveDate>;
}

impl<S: StateStorage + ?Sized> StateStorage for Arc<S> {
    fn save(&self, snapshot: &WorldSnapshot) -> bool {
        (**self).save(snapshot)
    }

    fn load(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot> {
        (**self).load(world_id, date)
    }

    fn latest_before(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot> {
        (**self).latest_before(world_id, date)
    }

    fn list_dates(&self, world_id: &str) -> Vec<NaiveDate> {
        (**self).list_dates(world_id)
    }
}

/// World ids become part of file names and keys.
pub(crate) fn validate_world_id(world_id: &str) -> StorageResult<()> {
    let valid = !world_id.is_empty()
        && world_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidData(format!(
            "world id '{world_id}' may only contain ASCII letters, digits, '-' and '_'"
        )))
    }
}

/// Rejects snapshots that could be written but never read back: JSON has no
/// representation for NaN or infinity.
pub(crate) fn validate_snapshot(snapshot: &WorldSnapshot) -> StorageResult<()> {
    validate_world_id(&snapshot.world_id)?;
    let clock = &snapshot.clock_state;
    let fields = [("total_hours", clock.total_hours), ("speed", clock.speed)];
    let metrics = snapshot
        .metrics
        .iter()
        .map(|(name, value)| (name.as_str(), *value));
    match fields.into_iter().chain(metrics).find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(StorageError::InvalidData(format!(
            "{name} is {value}, only finite numbers can be stored"
        ))),
        None => Ok(()),
    }
}

pub(crate) fn saved(result: StorageResult<()>, snapshot: &WorldSnapshot) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            error!(
                world = %snapshot.world_id,
                date = %snapshot.simulation_date,
                error = %err,
                "failed to save snapshot"
            );
            false
        }
    }
}

pub(crate) fn found<T>(result: StorageResult<Option<T>>, world_id: &str, operation: &str) -> Option<T> {
    result.unwrap_or_else(|err| {
        error!(world = %world_id, operation, error = %err, "snapshot lookup failed");
        None
    })
}

pub(crate) fn listed(result: StorageResult<Vec<NaiveDate>>, world_id: &str) -> Vec<NaiveDate> {
    result.unwrap_or_else(|err| {
        error!(world = %world_id, error = %err, "failed to list snapshot dates");
        Vec::new()
    })
}
