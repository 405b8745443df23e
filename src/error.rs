//! Scheduler faults.
//!
//! Order-request problems are not errors: they are reported through
//! [`crate::validation::ValidationError`] inside an order receipt. This
//! module covers everything else.
//!
//! # Error Code Convention
//!
//! | Error | Code | Fatal |
//! |-------|------|-------|
//! | [`SchedulerError::InvalidConfig`] | `FLEET_INVALID_CONFIG` | No |
//! | [`SchedulerError::InsufficientStationCapacity`] | `FLEET_PLACEMENT` | No |
//! | [`SchedulerError::DuplicateEntity`] | `FLEET_DUPLICATE_ENTITY` | No |
//! | [`SchedulerError::UnknownEntity`] | `FLEET_UNKNOWN_ENTITY` | No |
//! | [`SchedulerError::InvalidSlot`] | `FLEET_INVALID_SLOT` | No |
//! | [`SchedulerError::AmrCapacity`] | `FLEET_AMR_CAPACITY` | Yes |
//! | [`SchedulerError::StationCapacity`] | `FLEET_STATION_CAPACITY` | Yes |
//! | [`SchedulerError::Deadlock`] | `FLEET_DEADLOCK` | Yes |
//! | [`SchedulerError::StateMismatch`] | `FLEET_STATE_MISMATCH` | Yes |
//! | [`SchedulerError::ObjectNotFound`] | `FLEET_OBJECT_NOT_FOUND` | Yes |
//! | [`SchedulerError::SlotUnavailable`] | `FLEET_SLOT_UNAVAILABLE` | Yes |
//!
//! A fatal error halts the affected robot. Recovery requires a reset of the
//! whole scheduler; there is no partial rollback.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::models::{OrderId, SlotIndex, TaskId};

/// Scheduler fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Configuration cannot describe a runnable fleet.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stations cannot hold every object spawned at reset.
    #[error("not enough empty station slots to place {objects} objects ({available} available)")]
    InsufficientStationCapacity { objects: usize, available: usize },

    /// An entity id was registered twice.
    #[error("{kind} '{id}' is already registered")]
    DuplicateEntity { kind: &'static str, id: String },

    /// Lookup of an entity that does not exist.
    #[error("unknown {kind} '{id}'")]
    UnknownEntity { kind: &'static str, id: String },

    /// Slot index outside a holder's capacity, or already occupied.
    #[error("slot {slot} on '{holder}' cannot take an object")]
    InvalidSlot { holder: String, slot: SlotIndex },

    /// The AMR cannot hold the net pickups of a task.
    #[error("{amr} needs {required} free slots for task {task} but has {available}")]
    AmrCapacity {
        amr: String,
        task: TaskId,
        required: usize,
        available: usize,
    },

    /// No station slot is left for a delivery reservation.
    #[error("{station} has no slot left to reserve for delivery of order {order}")]
    StationCapacity { station: String, order: OrderId },

    /// Neither the AMR nor the station can make progress.
    #[error("deadlock between {amr} and {station} on task {task}: {reason}")]
    Deadlock {
        amr: String,
        station: String,
        task: TaskId,
        reason: String,
    },

    /// Physical AMR occupancy diverged from the projected state.
    #[error("{amr} state mismatch: expected {expected:?}, found {actual:?}")]
    StateMismatch {
        amr: String,
        expected: BTreeSet<String>,
        actual: BTreeSet<String>,
    },

    /// An object is not where a suborder needs it.
    #[error("object {object} not found on '{holder}'")]
    ObjectNotFound { object: String, holder: String },

    /// No usable slot for a transfer.
    #[error("no usable slot on '{holder}' for order {order}")]
    SlotUnavailable { holder: String, order: OrderId },
}

impl SchedulerError {
    pub(crate) fn unknown(kind: &'static str, id: impl ToString) -> Self {
        Self::UnknownEntity {
            kind,
            id: id.to_string(),
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "FLEET_INVALID_CONFIG",
            Self::InsufficientStationCapacity { .. } => "FLEET_PLACEMENT",
            Self::DuplicateEntity { .. } => "FLEET_DUPLICATE_ENTITY",
            Self::UnknownEntity { .. } => "FLEET_UNKNOWN_ENTITY",
            Self::InvalidSlot { .. } => "FLEET_INVALID_SLOT",
            Self::AmrCapacity { .. } => "FLEET_AMR_CAPACITY",
            Self::StationCapacity { .. } => "FLEET_STATION_CAPACITY",
            Self::Deadlock { .. } => "FLEET_DEADLOCK",
            Self::StateMismatch { .. } => "FLEET_STATE_MISMATCH",
            Self::ObjectNotFound { .. } => "FLEET_OBJECT_NOT_FOUND",
            Self::SlotUnavailable { .. } => "FLEET_SLOT_UNAVAILABLE",
        }
    }

    /// Whether the error indicates a broken scheduling invariant that halts
    /// the robot it occurred on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AmrCapacity { .. }
                | Self::StationCapacity { .. }
                | Self::Deadlock { .. }
                | Self::StateMismatch { .. }
                | Self::ObjectNotFound { .. }
                | Self::SlotUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_fatality() {
        let deadlock = SchedulerError::Deadlock {
            amr: "AMR0".into(),
            station: "Station1".into(),
            task: 4,
            reason: "both full".into(),
        };
        assert_eq!(deadlock.code(), "FLEET_DEADLOCK");
        assert!(deadlock.is_fatal());
        assert!(deadlock.to_string().contains("AMR0"));
        assert!(deadlock.to_string().contains("task 4"));

        let config = SchedulerError::InvalidConfig("bad".into());
        assert_eq!(config.code(), "FLEET_INVALID_CONFIG");
        assert!(!config.is_fatal());
    }

    #[test]
    fn test_unknown_message() {
        let err = SchedulerError::unknown("station", "Station9");
        assert_eq!(err.to_string(), "unknown station 'Station9'");
    }
}
