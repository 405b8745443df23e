//! Task model.
//!
//! A task is a robot's committed unit of work at one station: travel there,
//! then drain its suborders in sequence. Suborders of different orders share
//! a task when they target the same station.

use serde::{Deserialize, Serialize};

use super::SubOrderId;

/// Unique identifier for a task.
pub type TaskId = u64;

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in a robot queue.
    Queued,
    /// The robot is travelling to or working at the station.
    Executing,
    Completed,
    Failed,
    /// Not executable with present capacity; re-checked every tick.
    Sleep,
}

impl TaskStatus {
    /// Whether the task is finished.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A robot's unit of work at one station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Robot owning the task.
    pub assigned_amr: String,
    /// Target station.
    pub station_id: String,
    /// Ordered suborders.
    pub suborders: Vec<SubOrderId>,
    /// Task status.
    pub status: TaskStatus,
    /// Tick at which the task was created.
    pub created_tick: u64,
}

impl Task {
    /// Creates an empty queued task.
    pub fn new(
        id: TaskId,
        assigned_amr: impl Into<String>,
        station_id: impl Into<String>,
        created_tick: u64,
    ) -> Self {
        Self {
            id,
            assigned_amr: assigned_amr.into(),
            station_id: station_id.into(),
            suborders: Vec::new(),
            status: TaskStatus::Queued,
            created_tick,
        }
    }

    /// Whether new suborders may still be grouped into this task.
    #[inline]
    pub fn accepts_injection(&self) -> bool {
        matches!(self.status, TaskStatus::Queued | TaskStatus::Sleep)
    }

    /// Removes a suborder by id. Returns `false` if absent.
    pub fn remove_suborder(&mut self, suborder_id: SubOrderId) -> bool {
        match self.suborders.iter().position(|&s| s == suborder_id) {
            Some(idx) => {
                self.suborders.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Moves a suborder to the front. Returns `false` if absent.
    pub fn promote(&mut self, suborder_id: SubOrderId) -> bool {
        match self.suborders.iter().position(|&s| s == suborder_id) {
            Some(idx) => {
                let id = self.suborders.remove(idx);
                self.suborders.insert(0, id);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_suborder_editing() {
        let mut task = Task::new(1, "AMR0", "Station0", 0);
        task.suborders = vec![10, 11, 12];

        assert!(task.promote(12));
        assert_eq!(task.suborders, vec![12, 10, 11]);
        assert!(!task.promote(99));

        assert!(task.remove_suborder(10));
        assert_eq!(task.suborders, vec![12, 11]);
        assert!(!task.remove_suborder(10));
    }

    #[test]
    fn test_injection_statuses() {
        let mut task = Task::new(1, "AMR0", "Station0", 0);
        assert!(task.accepts_injection());
        task.status = TaskStatus::Sleep;
        assert!(task.accepts_injection());
        task.status = TaskStatus::Executing;
        assert!(!task.accepts_injection());
        assert!(!task.status.is_terminal());
        task.status = TaskStatus::Failed;
        assert!(task.status.is_terminal());
    }
}
