use super::{Subsystem, TaskTracker};
use crate::error::StateConsistencyError;
use crate::snapshot::OpaqueState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const TASK_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBoard {
    tasks: BTreeMap<u32, Task>,
    next_id: u32,
}

impl TaskBoard {
    pub fn task(&self, id: u32) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Tasks that are not done, by id.
    pub fn open_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .values()
            .filter(|task| task.status != TaskStatus::Done)
    }

    /// Unfinished tasks due on or before `date`.
    pub fn overdue(&self, date: NaiveDate) -> Vec<&Task> {
        self.open_tasks()
            .filter(|task| task.due.is_some_and(|due| due <= date))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Subsystem for TaskBoard {
    fn name(&self) -> &'static str {
        "tasks"
    }

    fn extract_state(&self) -> Result<OpaqueState, StateConsistencyError> {
        OpaqueState::encode(TASK_STATE_VERSION, self).map_err(|err| {
            StateConsistencyError::Subsystem {
                subsystem: "tasks",
                reason: err.to_string(),
            }
        })
    }

    fn restore_state(&mut self, state: &OpaqueState) -> Result<(), StateConsistencyError> {
        if state.is_empty() {
            *self = Self::default();
            return Ok(());
        }
        if state.version > TASK_STATE_VERSION {
            return Err(StateConsistencyError::Subsystem {
                subsystem: "tasks",
                reason: format!("unsupported state version {}", state.version),
            });
        }
        *self = state.decode().map_err(|err| StateConsistencyError::Subsystem {
            subsystem: "tasks",
            reason: err.to_string(),
        })?;
        Ok(())
    }
}

impl TaskTracker for TaskBoard {
    fn add_task(&mut self, title: &str, assignee: Option<String>, due: Option<NaiveDate>) -> u32 {
        self.next_id += 1;
        let id = self.next_id;
        debug!(id, title, "added task");
        self.tasks.insert(
            id,
            Task {
                id,
                title: title.to_string(),
                assignee,
                status: TaskStatus::Open,
                due,
            },
        );
        id
    }

    fn set_status(&mut self, id: u32, status: TaskStatus) -> bool {
        match self.tasks.get_mut(&id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => {
                warn!(id, "status change for unknown task");
                false
            }
        }
    }

    fn open_task_count(&self) -> usize {
        self.open_tasks().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn status_changes_drive_open_count() {
        let mut board = TaskBoard::default();
        let proposal = board.add_task("Write proposal", Some("emp-001".into()), Some(d(2024, 7, 10)));
        let review = board.add_task("Review budget", None, None);
        assert_eq!((proposal, review), (1, 2));
        assert_eq!(board.open_task_count(), 2);

        assert!(board.set_status(proposal, TaskStatus::Done));
        assert!(!board.set_status(99, TaskStatus::Done));
        assert_eq!(board.open_task_count(), 1);
        assert!(board.overdue(d(2024, 7, 31)).is_empty());
    }

    #[test]
    fn restored_board_keeps_id_sequence() {
        let mut board = TaskBoard::default();
        board.add_task("Quarterly plan", None, Some(d(2024, 7, 1)));
        let state = board.extract_state().unwrap();

        let mut restored = TaskBoard::default();
        restored.restore_state(&state).unwrap();
        assert_eq!(restored.overdue(d(2024, 7, 2)).len(), 1);
        assert_eq!(restored.add_task("Follow-up", None, None), 2);

        let newer = OpaqueState {
            version: TASK_STATE_VERSION + 1,
            payload: "{}".into(),
        };
        assert!(restored.restore_state(&newer).is_err());
    }
}
