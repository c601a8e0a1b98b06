//! TOML run configuration.
//!
//! ```toml
//! world_id = "acme"
//! world_type = "business"
//! speed = 1.0
//!
//! [hours]
//! start = "08:30"
//! end = "17:30"
//!
//! [calendar]
//! holiday_years = [2024, 2026]
//! holidays = { "2024-08-15" = "Founders Day" }
//! custom_working_days = { "2024-11-29" = true }
//! special_events = { "2024-07-10" = ["Board meeting"] }
//!
//! [storage]
//! backend = "json"
//! path = "state/acme"
//! ```

use crate::calendar::{BusinessCalendar, DEFAULT_HOLIDAY_YEARS};
use crate::clock::BusinessTimeManager;
use crate::error::ConfigurationError;
use crate::hours::{BusinessHours, TimeZoneTag, parse_time};
use crate::orchestrator::WorldOrchestrator;
use crate::profile::{WorldProfile, WorldType};
use crate::storage::{InMemoryStorage, JsonFileStorage, StateStorage};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub world_id: String,
    #[serde(default)]
    pub world_type: WorldType,
    /// Replaces the profile's display name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub timezone: Option<TimeZoneTag>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub hours: HoursConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Overrides applied on top of the world type's business hours.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HoursConfig {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub lunch_start: Option<String>,
    #[serde(default)]
    pub lunch_end: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_holiday_years")]
    pub holiday_years: [i32; 2],
    #[serde(default)]
    pub holidays: BTreeMap<String, String>,
    #[serde(default)]
    pub custom_working_days: BTreeMap<String, bool>,
    #[serde(default)]
    pub special_events: BTreeMap<String, Vec<String>>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            holiday_years: default_holiday_years(),
            holidays: BTreeMap::new(),
            custom_working_days: BTreeMap::new(),
            special_events: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_speed() -> f64 {
    1.0
}

fn default_holiday_years() -> [i32; 2] {
    [DEFAULT_HOLIDAY_YEARS.0, DEFAULT_HOLIDAY_YEARS.1]
}

impl SimulationConfig {
    /// Configuration with profile defaults and in-memory storage.
    pub fn new(world_id: impl Into<String>, world_type: WorldType) -> Self {
        Self {
            world_id: world_id.into(),
            world_type,
            name: None,
            timezone: None,
            speed: default_speed(),
            hours: HoursConfig::default(),
            calendar: CalendarConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                path: None,
            },
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&raw)?;
        info!(path = %path.as_ref().display(), world = %config.world_id, "loaded simulation config");
        Ok(config)
    }

    /// The world type's default profile with this file's overrides applied.
    pub fn profile(&self) -> Result<WorldProfile, ConfigurationError> {
        let mut profile = self.world_type.profile();
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        profile.hours = self.hours.apply(profile.hours)?;
        if let Some(timezone) = self.timezone {
            profile.hours.timezone = timezone;
        }
        Ok(profile)
    }

    /// Business calendar with the configured holiday years and overrides.
    pub fn calendar(&self, hours: BusinessHours) -> Result<BusinessCalendar, ConfigurationError> {
        let [first, last] = self.calendar.holiday_years;
        let mut calendar = BusinessCalendar::with_year_range(first, last).with_hours(hours);
        for (date, name) in &self.calendar.holidays {
            calendar.add_holiday(parse_date(date)?, name.clone());
        }
        for (date, working) in &self.calendar.custom_working_days {
            calendar.set_custom_working_day(parse_date(date)?, *working);
        }
        for (date, labels) in &self.calendar.special_events {
            let date = parse_date(date)?;
            for label in labels {
                calendar.add_special_event(date, label.clone());
            }
        }
        Ok(calendar)
    }

    /// Open the configured storage backend.
    pub fn open_storage(&self) -> Result<Box<dyn StateStorage + Send + Sync>, ConfigurationError> {
        let require_path = || {
            self.storage.path.clone().ok_or_else(|| {
                ConfigurationError::Storage(format!(
                    "backend {:?} needs a storage path",
                    self.storage.backend
                ))
            })
        };

        let storage: Box<dyn StateStorage + Send + Sync> = match self.storage.backend {
            StorageBackend::Memory => Box::new(InMemoryStorage::new()),
            StorageBackend::Json => Box::new(
                JsonFileStorage::new(require_path()?)
                    .map_err(|err| ConfigurationError::Storage(err.to_string()))?,
            ),
            #[cfg(feature = "sqlite")]
            StorageBackend::Sqlite => Box::new(
                crate::storage::SqliteStateStorage::new(require_path()?)
                    .map_err(|err| ConfigurationError::Storage(err.to_string()))?,
            ),
            #[cfg(not(feature = "sqlite"))]
            StorageBackend::Sqlite => {
                return Err(ConfigurationError::Storage(
                    "sqlite backend requires the `sqlite` feature".into(),
                ));
            }
        };
        Ok(storage)
    }

    /// Orchestrator whose clock starts at `start_date`, with the profile's
    /// standing meeting already scheduled.
    pub fn build_orchestrator(&self, start_date: NaiveDate) -> Result<WorldOrchestrator, ConfigurationError> {
        let profile = self.profile()?;
        let calendar = self.calendar(profile.hours)?;
        let mut clock = BusinessTimeManager::with_calendar(start_date, calendar).with_speed(self.speed);
        if let Some((meeting, rule)) = profile.recurring_meeting() {
            clock.schedule_recurring(meeting, rule);
        }
        let storage = self.open_storage()?;
        Ok(WorldOrchestrator::new(self.world_id.clone(), profile, clock, storage))
    }
}

impl HoursConfig {
    fn apply(&self, base: BusinessHours) -> Result<BusinessHours, ConfigurationError> {
        let pick = |value: &Option<String>, fallback| match value {
            Some(raw) => parse_time(raw),
            None => Ok(fallback),
        };
        BusinessHours::new(
            pick(&self.start, base.start)?,
            pick(&self.end, base.end)?,
            pick(&self.lunch_start, base.lunch_start)?,
            pick(&self.lunch_end, base.lunch_end)?,
            base.timezone,
        )
    }
}

fn parse_date(input: &str) -> Result<NaiveDate, ConfigurationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|err| ConfigurationError::InvalidDate {
        input: input.to_string(),
        reason: err.to_string(),
    })
}
