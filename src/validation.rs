//! Order request validation.
//!
//! Checks an order request against the registry and the live orders before
//! anything is allocated. Detects:
//! - Identical source and destination
//! - Unknown stations
//! - Objects already moved by a live order
//! - Objects missing from the source station
//!
//! Every failing check is reported; nothing is mutated.

use crate::ledger::Ledger;
use crate::models::SlotHolder;
use crate::registry::Registry;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Source and destination are the same station.
    SameStation,
    /// A station id is not registered.
    UnknownStation,
    /// Another live order already moves the object.
    ObjectInLiveOrder,
    /// The object is not on the source station.
    ObjectNotAtSource,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a single-object order request.
///
/// Checks:
/// 1. Source and destination differ
/// 2. Both stations exist
/// 3. No live order references the object
/// 4. The object sits on the source station (when the source exists)
pub fn validate_order(
    registry: &Registry,
    ledger: &Ledger,
    object_id: &str,
    source_station: &str,
    destination_station: &str,
) -> ValidationResult {
    let mut errors = Vec::new();

    if source_station == destination_station {
        errors.push(ValidationError::new(
            ValidationErrorKind::SameStation,
            format!("Invalid order: source and destination are both {source_station}"),
        ));
    }

    for station_id in [source_station, destination_station] {
        if !registry.has_station(station_id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownStation,
                format!("Invalid order: unknown station {station_id}"),
            ));
        }
    }

    if let Some(order_id) = ledger.live_order_for_object(object_id) {
        errors.push(ValidationError::new(
            ValidationErrorKind::ObjectInLiveOrder,
            format!("Invalid order: {object_id} is being processed by order {order_id}"),
        ));
    }

    if let Ok(source) = registry.station(source_station) {
        if !source.holds(object_id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::ObjectNotAtSource,
                format!("Invalid order: {object_id} not found in {source_station}"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Joins validation messages into one receipt message.
pub fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
