use crate::clock::ClockState;
use crate::profile::WorldType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SNAPSHOT_VERSION: &str = "1.0";

/// Sub-state owned by one subsystem. The payload is only ever encoded and
/// decoded by that subsystem; everything else moves it around untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpaqueState {
    pub version: u32,
    pub payload: String,
}

impl OpaqueState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Serialize `value` as a payload tagged with `version`.
    pub fn encode<T: Serialize>(version: u32, value: &T) -> serde_json::Result<Self> {
        Ok(Self {
            version,
            payload: serde_json::to_string(value)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.payload)
    }
}

/// Everything needed to resume a world on the day after `simulation_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub world_id: String,
    pub world_type: WorldType,
    pub simulation_date: NaiveDate,
    pub clock_state: ClockState,
    #[serde(default)]
    pub task_state: OpaqueState,
    #[serde(default)]
    pub directory_state: OpaqueState,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub extension_state: OpaqueState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub notes: String,
}

impl WorldSnapshot {
    /// Snapshot stamped with the current time and empty sub-states.
    pub fn new(
        world_id: impl Into<String>,
        world_type: WorldType,
        simulation_date: NaiveDate,
        clock_state: ClockState,
    ) -> Self {
        Self {
            world_id: world_id.into(),
            world_type,
            simulation_date,
            clock_state,
            task_state: OpaqueState::empty(),
            directory_state: OpaqueState::empty(),
            metrics: BTreeMap::new(),
            extension_state: OpaqueState::empty(),
            started_on: None,
            created_at: Utc::now(),
            version: SNAPSHOT_VERSION.to_string(),
            notes: String::new(),
        }
    }

    /// A snapshot is self-consistent when its clock sits on its own date.
    pub fn is_consistent(&self) -> bool {
        self.clock_state.virtual_date == self.simulation_date
    }
}
