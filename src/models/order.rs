//! Order model and the order submission wire types.
//!
//! An order asks for one object to be moved from a source station to a
//! destination station. At most one live order may reference an object.

use serde::{Deserialize, Serialize};

use super::SubOrderId;

/// Unique identifier for an order.
pub type OrderId = u64;

/// Priority given to orders that do not specify one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
}

impl OrderStatus {
    /// Whether the order is finished (successfully or not).
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A transport order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Object to move.
    pub object_id: String,
    /// Station the object is picked up from.
    pub source_station: String,
    /// Station the object is delivered to.
    pub destination_station: String,
    /// Whether suborders may join existing tasks.
    pub allow_grouping: bool,
    /// Scheduling priority (higher = more important).
    pub priority: i32,
    /// Pickup suborder.
    pub pickup: SubOrderId,
    /// Delivery suborder.
    pub delivery: SubOrderId,
    /// Order status.
    pub status: OrderStatus,
    /// Robot chosen by assignment.
    pub assigned_amr: Option<String>,
    /// Tick at which the order was accepted.
    pub created_tick: u64,
    /// Tick at which the order reached a terminal status.
    pub finished_tick: Option<u64>,
}

impl Order {
    /// Ticks from acceptance to completion, if finished.
    pub fn flow_ticks(&self) -> Option<u64> {
        self.finished_tick
            .map(|end| end.saturating_sub(self.created_tick))
    }
}

/// One object id or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectSelector {
    One(String),
    Many(Vec<String>),
}

impl ObjectSelector {
    /// Selected object ids, in request order.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::One(id) => vec![id.as_str()],
            Self::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

/// Order submission request.
///
/// Each selected object becomes an independent order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Object(s) to move.
    pub object_id: ObjectSelector,
    /// Source station id.
    pub source_station: String,
    /// Destination station id.
    pub destination_station: String,
    /// Whether suborders may join existing tasks.
    #[serde(default = "default_grouping")]
    pub allow_grouping: bool,
    /// Scheduling priority (higher = more important).
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_grouping() -> bool {
    true
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl OrderRequest {
    /// Creates a request for a single object with default grouping and priority.
    pub fn new(
        object_id: impl Into<String>,
        source_station: impl Into<String>,
        destination_station: impl Into<String>,
    ) -> Self {
        Self {
            object_id: ObjectSelector::One(object_id.into()),
            source_station: source_station.into(),
            destination_station: destination_station.into(),
            allow_grouping: true,
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Replaces the object selection with a list.
    pub fn with_objects(mut self, object_ids: Vec<String>) -> Self {
        self.object_id = ObjectSelector::Many(object_ids);
        self
    }

    /// Sets grouping.
    pub fn with_grouping(mut self, allow_grouping: bool) -> Self {
        self.allow_grouping = allow_grouping;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Result of submitting one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
}

impl OrderReceipt {
    pub(crate) fn accepted(order_id: OrderId) -> Self {
        Self {
            success: true,
            message: format!("Order {order_id} created."),
            order_id: Some(order_id),
        }
    }

    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            order_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_json() {
        let req: OrderRequest = serde_json::from_str(
            r#"{"object_id": "Object01", "source_station": "Station0", "destination_station": "Station1"}"#,
        )
        .unwrap();
        assert_eq!(req.object_id.ids(), vec!["Object01"]);
        assert!(req.allow_grouping);
        assert_eq!(req.priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn test_request_with_object_list() {
        let req: OrderRequest = serde_json::from_str(
            r#"{"object_id": ["Object01", "Object02"], "source_station": "Station0",
                "destination_station": "Station1", "allow_grouping": false, "priority": 5}"#,
        )
        .unwrap();
        assert_eq!(req.object_id.ids(), vec!["Object01", "Object02"]);
        assert!(!req.allow_grouping);
        assert_eq!(req.priority, 5);
    }

    #[test]
    fn test_receipt_wire_shape() {
        let ok = serde_json::to_value(OrderReceipt::accepted(4)).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["order_id"], 4);

        let rejected = serde_json::to_value(OrderReceipt::rejected("nope")).unwrap();
        assert_eq!(rejected["success"], false);
        assert!(rejected.get("order_id").is_none());
    }

    #[test]
    fn test_order_status_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }
}
