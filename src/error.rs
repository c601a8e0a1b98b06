use chrono::NaiveDate;
use std::io;
use thiserror::Error;

use crate::orchestrator::DayPhase;
use crate::profile::WorldType;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "business hours must satisfy start < lunch start < lunch end < end (got {start}-{end}, lunch {lunch_start}-{lunch_end})"
    )]
    InvalidHours {
        start: String,
        end: String,
        lunch_start: String,
        lunch_end: String,
    },
    #[error("no working day found within {limit_days} days after {from}")]
    NoWorkingDay { from: NaiveDate, limit_days: i64 },
    #[error("invalid time '{input}': {reason}")]
    InvalidTime { input: String, reason: String },
    #[error("invalid date '{input}': {reason}")]
    InvalidDate { input: String, reason: String },
    #[error("invalid storage settings: {0}")]
    Storage(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StateConsistencyError {
    #[error("snapshot for {date} belongs to a {found} world, expected {expected}")]
    WorldTypeMismatch {
        date: NaiveDate,
        expected: WorldType,
        found: WorldType,
    },
    #[error("snapshot for {date} belongs to world '{found}', expected '{expected}'")]
    WorldIdMismatch {
        date: NaiveDate,
        expected: String,
        found: String,
    },
    #[error("{subsystem} state could not be restored: {reason}")]
    Subsystem {
        subsystem: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum PreconditionViolation {
    #[error("cannot save {date}: world was never initialized")]
    NotInitialized { date: NaiveDate },
    #[error("cannot initialize {date}: day was not prepared by this orchestrator")]
    NotPrepared { date: NaiveDate },
    #[error("cannot initialize {date}: world already initialized")]
    AlreadyInitialized { date: NaiveDate },
    #[error("{operation} on {date} is not allowed while the orchestrator is {phase}")]
    OutOfOrder {
        operation: &'static str,
        date: NaiveDate,
        phase: DayPhase,
    },
}

#[derive(Debug, Error)]
#[error("simulation engine failed: {message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    StateConsistency(#[from] StateConsistencyError),
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
