//! The live world handed to the conversation engine for one simulated day.
//!
//! The orchestrator only ever touches a world through the [`Subsystem`]
//! contract (extract / restore opaque sub-state) and the metric counters.
//! Department and manager queries on [`Directory`] exist for the engine.

mod directory;
mod tasks;

pub use directory::{Member, Roster};
pub use tasks::{Task, TaskBoard, TaskStatus};

use crate::calendar::BusinessDay;
use crate::error::StateConsistencyError;
use crate::event::{Event, EventKind};
use crate::profile::{WorldProfile, WorldType};
use crate::snapshot::OpaqueState;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const METRIC_TOTAL_DAYS: &str = "total_simulation_days";
pub const METRIC_PRODUCTIVITY: &str = "productivity_score";
pub const METRIC_COLLABORATION: &str = "collaboration_events";
pub const METRIC_DECISIONS: &str = "decisions_made";
pub const METRIC_MEETINGS: &str = "meetings_completed";
pub const METRIC_DEADLINES: &str = "deadlines_tracked";
pub const METRIC_ANNOUNCEMENTS: &str = "announcements_made";
pub const METRIC_EVENTS_INJECTED: &str = "events_injected";

const BOOTSTRAP_METRICS: [&str; 5] = [
    METRIC_TOTAL_DAYS,
    METRIC_PRODUCTIVITY,
    METRIC_COLLABORATION,
    METRIC_DECISIONS,
    METRIC_MEETINGS,
];

/// Extractable / restorable sub-state.
pub trait Subsystem {
    fn name(&self) -> &'static str;

    fn extract_state(&self) -> Result<OpaqueState, StateConsistencyError>;

    /// An empty state resets the subsystem.
    fn restore_state(&mut self, state: &OpaqueState) -> Result<(), StateConsistencyError>;
}

/// Personnel directory.
pub trait Directory: Subsystem + Send {
    fn departments(&self) -> Vec<String>;

    fn manager_of(&self, member_id: &str) -> Option<String>;

    fn members_in(&self, department: &str) -> Vec<String>;

    /// Populate a brand-new world. Restored worlds are never seeded.
    fn seed(&mut self, _profile: &WorldProfile) {}
}

pub trait TaskTracker: Subsystem + Send {
    /// Returns the new task's id.
    fn add_task(&mut self, title: &str, assignee: Option<String>, due: Option<NaiveDate>) -> u32;

    /// `false` when no task has this id.
    fn set_status(&mut self, id: u32, status: TaskStatus) -> bool;

    fn open_task_count(&self) -> usize;
}

/// Builds the subsystems of each fresh world handle.
pub trait SubsystemFactory: Send + Sync {
    fn directory(&self) -> Box<dyn Directory>;

    fn task_tracker(&self) -> Box<dyn TaskTracker>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSubsystems;

impl SubsystemFactory for DefaultSubsystems {
    fn directory(&self) -> Box<dyn Directory> {
        Box::new(Roster::default())
    }

    fn task_tracker(&self) -> Box<dyn TaskTracker> {
        Box::new(TaskBoard::default())
    }
}

#[derive(Debug, Serialize)]
struct ExtensionDefaults<'a> {
    world_type: WorldType,
    profile: &'a str,
    business_hours_start: String,
    business_hours_end: String,
}

pub struct World {
    id: String,
    world_type: WorldType,
    name: String,
    business_day: BusinessDay,
    metrics: BTreeMap<String, f64>,
    started_on: Option<NaiveDate>,
    directory: Box<dyn Directory>,
    tasks: Box<dyn TaskTracker>,
    extension: OpaqueState,
    injected: Vec<Event>,
}

impl World {
    pub(crate) fn new(
        id: &str,
        world_type: WorldType,
        business_day: BusinessDay,
        factory: &dyn SubsystemFactory,
    ) -> Self {
        Self {
            name: format!("{id}_{}", business_day.date),
            id: id.to_string(),
            world_type,
            business_day,
            metrics: BTreeMap::new(),
            started_on: None,
            directory: factory.directory(),
            tasks: factory.task_tracker(),
            extension: OpaqueState::empty(),
            injected: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, `{world_id}_{date}`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn world_type(&self) -> WorldType {
        self.world_type
    }

    pub fn date(&self) -> NaiveDate {
        self.business_day.date
    }

    pub fn business_day(&self) -> &BusinessDay {
        &self.business_day
    }

    /// Date the world was first bootstrapped.
    pub fn started_on(&self) -> Option<NaiveDate> {
        self.started_on
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    /// Metric value, zero when never recorded.
    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }

    pub fn set_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }

    /// Add `by` to a metric, creating it at zero.
    pub fn increment(&mut self, name: &str, by: f64) {
        *self.metrics.entry(name.to_string()).or_insert(0.0) += by;
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    pub fn directory_mut(&mut self) -> &mut dyn Directory {
        self.directory.as_mut()
    }

    pub fn tasks(&self) -> &dyn TaskTracker {
        self.tasks.as_ref()
    }

    pub fn tasks_mut(&mut self) -> &mut dyn TaskTracker {
        self.tasks.as_mut()
    }

    /// Free-form state carried between days for the engine.
    pub fn extension(&self) -> &OpaqueState {
        &self.extension
    }

    pub fn set_extension(&mut self, state: OpaqueState) {
        self.extension = state;
    }

    /// Events injected into this world, in injection order.
    pub fn injected_events(&self) -> &[Event] {
        &self.injected
    }

    pub(crate) fn bootstrap(&mut self, profile: &WorldProfile) -> Result<(), StateConsistencyError> {
        info!(world = %self.id, date = %self.date(), "bootstrapping new world");
        for name in BOOTSTRAP_METRICS {
            self.metrics.insert(name.to_string(), 0.0);
        }
        self.started_on = Some(self.date());
        self.directory.seed(profile);
        self.extension = OpaqueState::encode(
            1,
            &ExtensionDefaults {
                world_type: self.world_type,
                profile: &profile.name,
                business_hours_start: profile.hours.start.format("%H:%M").to_string(),
                business_hours_end: profile.hours.end.format("%H:%M").to_string(),
            },
        )
        .map_err(|err| StateConsistencyError::Subsystem {
            subsystem: "extension",
            reason: err.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn restore(
        &mut self,
        directory: &OpaqueState,
        tasks: &OpaqueState,
        metrics: &BTreeMap<String, f64>,
        extension: &OpaqueState,
        started_on: Option<NaiveDate>,
    ) -> Result<(), StateConsistencyError> {
        self.directory.restore_state(directory)?;
        self.tasks.restore_state(tasks)?;
        self.metrics
            .extend(metrics.iter().map(|(name, value)| (name.clone(), *value)));
        self.extension = extension.clone();
        self.started_on = started_on;
        debug!(
            world = %self.id,
            subsystems = ?[self.directory.name(), self.tasks.name()],
            "restored subsystems"
        );
        Ok(())
    }

    /// Bookkeeping for a scheduled event. Never produces dialogue.
    pub(crate) fn inject_event(&mut self, event: &Event) {
        match event.kind {
            EventKind::Meeting => {
                self.increment(METRIC_MEETINGS, 1.0);
                debug!(title = %event.title, attendees = event.attendees.len(), "injected meeting");
            }
            EventKind::Deadline => {
                self.increment(METRIC_DEADLINES, 1.0);
                debug!(title = %event.title, priority = ?event.priority, "injected deadline");
            }
            EventKind::Announcement => {
                self.increment(METRIC_ANNOUNCEMENTS, 1.0);
                debug!(title = %event.title, "injected announcement");
            }
            other => debug!(title = %event.title, kind = %other, "injected event without bookkeeping"),
        }
        self.increment(METRIC_EVENTS_INJECTED, 1.0);
        self.injected.push(event.clone());
    }

    pub(crate) fn begin_day(&mut self) {
        self.increment(METRIC_TOTAL_DAYS, 1.0);
    }

    pub(crate) fn directory_state(&self) -> Result<OpaqueState, StateConsistencyError> {
        self.directory.extract_state()
    }

    pub(crate) fn task_state(&self) -> Result<OpaqueState, StateConsistencyError> {
        self.tasks.extract_state()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("world_type", &self.world_type)
            .field("date", &self.business_day.date)
            .field("metrics", &self.metrics)
            .field("injected", &self.injected.len())
            .finish_non_exhaustive()
    }
}
