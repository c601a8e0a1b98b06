pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod hours;
pub mod orchestrator;
pub mod profile;
pub mod scheduler;
pub mod snapshot;
pub mod storage;
pub mod telemetry;
pub mod world;

pub use calendar::{BusinessCalendar, BusinessDay, DayType};
pub use clock::{BusinessTimeManager, ClockState, TimeSummary};
pub use config::SimulationConfig;
pub use error::{
    ConfigurationError, EngineError, OrchestratorError, PreconditionViolation,
    StateConsistencyError, StorageError,
};
pub use event::{Event, EventKind, Priority, RecurrenceRule};
pub use hours::{BusinessHours, TimeZoneTag};
pub use orchestrator::{ConversationEngine, DayPhase, DayReport, SimulationDay, WorldOrchestrator};
pub use profile::{MeetingCadence, WorldProfile, WorldType};
pub use scheduler::{EventScheduler, ScheduledEvent, SchedulerState};
pub use snapshot::{OpaqueState, WorldSnapshot};
pub use storage::{InMemoryStorage, JsonFileStorage, StateStorage};
#[cfg(feature = "sqlite")]
pub use storage::SqliteStateStorage;
pub use world::World;
