//! Day-by-day sequencing of a persistent world.
//!
//! Each simulated date moves through `prepare_day`, `initialize_world`, the
//! external engine and `save_day`, in that order. A day abandoned before
//! `save_day` leaves storage untouched.

use crate::calendar::{BusinessCalendar, BusinessDay, DayType};
use crate::clock::BusinessTimeManager;
use crate::error::{EngineError, OrchestratorError, PreconditionViolation, StateConsistencyError};
use crate::event::{Event, RecurrenceRule};
use crate::profile::{WorldProfile, WorldType};
use crate::snapshot::WorldSnapshot;
use crate::storage::StateStorage;
use crate::world::{DefaultSubsystems, SubsystemFactory, World};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPhase {
    Unprepared,
    Prepared,
    Initialized,
    Persisted,
}

impl fmt::Display for DayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DayPhase::Unprepared => "unprepared",
            DayPhase::Prepared => "prepared",
            DayPhase::Initialized => "initialized",
            DayPhase::Persisted => "persisted",
        };
        f.write_str(label)
    }
}

/// Everything gathered for one simulated date. Only
/// [`WorldOrchestrator::prepare_day`] creates one.
#[derive(Debug)]
pub struct SimulationDay {
    date: NaiveDate,
    business_day: BusinessDay,
    events: Vec<Event>,
    previous: Option<WorldSnapshot>,
    world: Option<World>,
}

impl SimulationDay {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn business_day(&self) -> &BusinessDay {
        &self.business_day
    }

    /// Events injected into this day.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Snapshot the world is restored from, if any.
    pub fn previous(&self) -> Option<&WorldSnapshot> {
        self.previous.as_ref()
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    /// Live world, once `initialize_world` has run.
    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.world.as_mut()
    }
}

/// The conversation engine that produces a day's activity.
#[async_trait]
pub trait ConversationEngine: Send + Sync {
    async fn run(&self, world: &mut World, rounds: u32) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub day_type: DayType,
    pub is_working_day: bool,
    pub events_injected: usize,
    pub metrics: BTreeMap<String, f64>,
    pub state_saved: bool,
}

pub struct WorldOrchestrator {
    world_id: String,
    profile: WorldProfile,
    clock: BusinessTimeManager,
    storage: Box<dyn StateStorage + Send + Sync>,
    subsystems: Box<dyn SubsystemFactory>,
    phase: DayPhase,
    current_date: Option<NaiveDate>,
}

impl WorldOrchestrator {
    /// Orchestrator owning `clock` and persisting through `storage`.
    pub fn new(
        world_id: impl Into<String>,
        profile: WorldProfile,
        clock: BusinessTimeManager,
        storage: Box<dyn StateStorage + Send + Sync>,
    ) -> Self {
        let world_id = world_id.into();
        info!(world = %world_id, world_type = %profile.world_type, "created orchestrator");
        Self {
            world_id,
            profile,
            clock,
            storage,
            subsystems: Box::new(DefaultSubsystems),
            phase: DayPhase::Unprepared,
            current_date: None,
        }
    }

    /// Orchestrator for a stock world type: default holiday table, the
    /// profile's business hours and its standing meeting.
    pub fn from_profile(
        world_id: impl Into<String>,
        world_type: WorldType,
        start_date: NaiveDate,
        storage: Box<dyn StateStorage + Send + Sync>,
    ) -> Self {
        let profile = world_type.profile();
        let calendar = BusinessCalendar::default().with_hours(profile.hours);
        let mut clock = BusinessTimeManager::with_calendar(start_date, calendar);
        if let Some((meeting, rule)) = profile.recurring_meeting() {
            clock.schedule_recurring(meeting, rule);
        }
        Self::new(world_id, profile, clock, storage)
    }

    /// Use custom directory and task subsystems for every world handle.
    pub fn with_subsystems(mut self, subsystems: Box<dyn SubsystemFactory>) -> Self {
        self.subsystems = subsystems;
        self
    }

    pub fn world_id(&self) -> &str {
        &self.world_id
    }

    pub fn profile(&self) -> &WorldProfile {
        &self.profile
    }

    pub fn world_type(&self) -> WorldType {
        self.profile.world_type
    }

    /// Lifecycle position of the current day.
    pub fn phase(&self) -> DayPhase {
        self.phase
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_date
    }

    pub fn clock(&self) -> &BusinessTimeManager {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut BusinessTimeManager {
        &mut self.clock
    }

    /// Schedule a one-off event on the owned clock.
    pub fn schedule_event(&mut self, date: NaiveDate, event: Event) -> Uuid {
        self.clock.schedule_event(date, event)
    }

    pub fn schedule_recurring(&mut self, template: Event, rule: RecurrenceRule) -> Uuid {
        self.clock.schedule_recurring(template, rule)
    }

    /// Position the clock at `date` and look up the snapshot to resume from.
    pub fn prepare_day(&mut self, date: NaiveDate) -> SimulationDay {
        if self.phase == DayPhase::Initialized {
            warn!(
                world = %self.world_id,
                abandoned = ?self.current_date,
                "preparing a new day before the initialized one was saved"
            );
        }
        let position = self.clock.current_date();
        if date < position {
            warn!(world = %self.world_id, from = %position, to = %date, "time travel: rewinding clock");
        }

        self.clock.position_at(date);
        let business_day = self.clock.current_business_day();
        let previous = self.storage.latest_before(&self.world_id, date);
        let events = self.clock.events_for_date(date);

        info!(
            world = %self.world_id,
            %date,
            day_type = %business_day.day_type,
            events = events.len(),
            previous = ?previous.as_ref().map(|snapshot| snapshot.simulation_date),
            "prepared day"
        );
        self.phase = DayPhase::Prepared;
        self.current_date = Some(date);

        SimulationDay {
            date,
            business_day,
            events,
            previous,
            world: None,
        }
    }

    /// Attach a live world to `day`, restored from the previous snapshot when
    /// there is one, then inject the day's events.
    pub fn initialize_world<'d>(
        &mut self,
        day: &'d mut SimulationDay,
    ) -> Result<&'d mut World, OrchestratorError> {
        if day.world.is_some() {
            return Err(PreconditionViolation::AlreadyInitialized { date: day.date }.into());
        }
        if self.phase != DayPhase::Prepared || self.current_date != Some(day.date) {
            return Err(PreconditionViolation::NotPrepared { date: day.date }.into());
        }

        let mut world = World::new(
            &self.world_id,
            self.profile.world_type,
            day.business_day.clone(),
            self.subsystems.as_ref(),
        );

        match &day.previous {
            Some(snapshot) => self.restore(&mut world, snapshot, day.date)?,
            None => world.bootstrap(&self.profile)?,
        }
        // The journal may have grown since `prepare_day`, through a restore
        // or through direct scheduling.
        day.events = self.clock.events_for_date(day.date);

        world.begin_day();
        for event in &day.events {
            world.inject_event(event);
        }
        info!(
            world = %self.world_id,
            date = %day.date,
            restored = day.previous.is_some(),
            events = day.events.len(),
            "initialized world"
        );

        self.phase = DayPhase::Initialized;
        Ok(day.world.insert(world))
    }

    fn restore(
        &mut self,
        world: &mut World,
        snapshot: &WorldSnapshot,
        date: NaiveDate,
    ) -> Result<(), StateConsistencyError> {
        if snapshot.world_type != self.profile.world_type {
            return Err(StateConsistencyError::WorldTypeMismatch {
                date: snapshot.simulation_date,
                expected: self.profile.world_type,
                found: snapshot.world_type,
            });
        }
        if snapshot.world_id != self.world_id {
            return Err(StateConsistencyError::WorldIdMismatch {
                date: snapshot.simulation_date,
                expected: self.world_id.clone(),
                found: snapshot.world_id.clone(),
            });
        }

        world.restore(
            &snapshot.directory_state,
            &snapshot.task_state,
            &snapshot.metrics,
            &snapshot.extension_state,
            snapshot.started_on,
        )?;

        self.clock.load_state(&snapshot.clock_state);
        if snapshot.is_consistent() {
            self.clock.resume_at(date);
        } else {
            warn!(
                world = %self.world_id,
                snapshot_date = %snapshot.simulation_date,
                clock_date = %snapshot.clock_state.virtual_date,
                "inconsistent snapshot, keeping its restored clock date"
            );
        }
        debug!(world = %self.world_id, from = %snapshot.simulation_date, "restored world state");
        Ok(())
    }

    /// Persist the attached world as the snapshot for `day`. Returns the
    /// storage outcome; lifecycle violations never reach storage.
    pub fn save_day(&mut self, day: &SimulationDay) -> Result<bool, OrchestratorError> {
        let Some(world) = day.world.as_ref() else {
            return Err(PreconditionViolation::NotInitialized { date: day.date }.into());
        };
        if self.current_date != Some(day.date)
            || !matches!(self.phase, DayPhase::Initialized | DayPhase::Persisted)
        {
            return Err(PreconditionViolation::OutOfOrder {
                operation: "save_day",
                date: day.date,
                phase: self.phase,
            }
            .into());
        }

        let mut snapshot = WorldSnapshot::new(
            self.world_id.clone(),
            self.profile.world_type,
            day.date,
            self.clock.save_state(),
        );
        snapshot.directory_state = world.directory_state()?;
        snapshot.task_state = world.task_state()?;
        snapshot.metrics = world.metrics().clone();
        snapshot.extension_state = world.extension().clone();
        snapshot.started_on = world.started_on();
        snapshot.notes = format!("{} ({})", world.name(), day.business_day.day_type);

        let saved = self.storage.save(&snapshot);
        if saved {
            self.phase = DayPhase::Persisted;
            info!(world = %self.world_id, date = %day.date, "saved day");
        } else {
            warn!(world = %self.world_id, date = %day.date, "day was not saved");
        }
        Ok(saved)
    }

    /// Prepare, initialize, run `rounds` engine rounds and save one day. An
    /// engine failure aborts the day before anything is written.
    pub async fn run_day(
        &mut self,
        date: NaiveDate,
        rounds: u32,
        engine: &dyn ConversationEngine,
    ) -> Result<DayReport, OrchestratorError> {
        let mut day = self.prepare_day(date);
        let world = self.initialize_world(&mut day)?;
        engine.run(world, rounds).await?;
        let state_saved = self.save_day(&day)?;

        let metrics = day
            .world()
            .map(|world| world.metrics().clone())
            .unwrap_or_default();
        Ok(DayReport {
            date,
            day_type: day.business_day.day_type,
            is_working_day: day.business_day.is_working_day,
            events_injected: day.events.len(),
            metrics,
            state_saved,
        })
    }

    /// Dates with a stored snapshot, ascending.
    pub fn history(&self) -> Vec<NaiveDate> {
        self.storage.list_dates(&self.world_id)
    }

    /// Stored snapshot for exactly `date`.
    pub fn load_snapshot(&self, date: NaiveDate) -> Option<WorldSnapshot> {
        self.storage.load(&self.world_id, date)
    }
}

impl fmt::Debug for WorldOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldOrchestrator")
            .field("world_id", &self.world_id)
            .field("world_type", &self.profile.world_type)
            .field("phase", &self.phase)
            .field("current_date", &self.current_date)
            .field("clock", &self.clock.current_datetime())
            .finish_non_exhaustive()
    }
}
