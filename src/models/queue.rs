//! Per-robot task queue.
//!
//! The queue keeps a parallel sequence of expected states: entry `i` is the
//! set of objects the robot should carry once task `i` completes. Both
//! sequences always have the same length.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::TaskId;

/// Projected robot occupancy after a queue position completes.
pub type ExpectedState = BTreeSet<String>;

/// Ordered tasks of one robot plus their projected occupancy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmrQueue {
    pub tasks: Vec<TaskId>,
    pub expected_states: Vec<ExpectedState>,
}

impl AmrQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Queue position of `task_id`.
    pub fn position(&self, task_id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|&t| t == task_id)
    }

    /// Projected state after the last task, or `None` for an empty queue.
    pub fn tail_state(&self) -> Option<&ExpectedState> {
        self.expected_states.last()
    }

    /// Appends a task, seeding its projection from the previous tail.
    pub fn push(&mut self, task_id: TaskId) {
        let seed = self.tail_state().cloned().unwrap_or_default();
        self.tasks.push(task_id);
        self.expected_states.push(seed);
    }

    /// Removes a task and its projection. Returns the former position.
    pub fn remove(&mut self, task_id: TaskId) -> Option<usize> {
        let idx = self.position(task_id)?;
        self.tasks.remove(idx);
        if idx < self.expected_states.len() {
            self.expected_states.remove(idx);
        }
        Some(idx)
    }

    /// Moves a task (and its projection) to the head of the queue.
    pub fn promote(&mut self, task_id: TaskId) -> bool {
        let Some(idx) = self.position(task_id) else {
            return false;
        };
        let task = self.tasks.remove(idx);
        self.tasks.insert(0, task);
        if idx < self.expected_states.len() {
            let state = self.expected_states.remove(idx);
            self.expected_states.insert(0, state);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_seeds_from_tail() {
        let mut queue = AmrQueue::new();
        queue.push(1);
        assert!(queue.expected_states[0].is_empty());

        queue.expected_states[0].insert("Object01".into());
        queue.push(2);
        assert_eq!(queue.len(), 2);
        assert!(queue.expected_states[1].contains("Object01"));
    }

    #[test]
    fn test_remove_and_promote_keep_lengths() {
        let mut queue = AmrQueue::new();
        for id in 1..=3 {
            queue.push(id);
        }
        assert!(queue.promote(3));
        assert_eq!(queue.tasks, vec![3, 1, 2]);
        assert_eq!(queue.remove(1), Some(1));
        assert_eq!(queue.tasks, vec![3, 2]);
        assert_eq!(queue.expected_states.len(), queue.tasks.len());
        assert_eq!(queue.remove(42), None);
        assert!(!queue.promote(42));
    }
}
