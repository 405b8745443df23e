//! Fleet domain models.
//!
//! Provides the entities the scheduler owns (robots, stations, parking
//! spots and their slots) and the three-tier work hierarchy
//! (order → suborder → task).
//!
//! # Domain Mappings
//!
//! | u-fleet | Warehouse | Hospital | Lab automation |
//! |---------|-----------|----------|----------------|
//! | Amr | Tote robot | Delivery cart | Sample shuttle |
//! | Station | Shelf | Ward cabinet | Instrument rack |
//! | Order | Move request | Medication run | Sample transfer |
//! | Task | Shelf visit | Cabinet stop | Rack stop |

mod amr;
mod order;
mod position;
mod queue;
mod slot;
mod station;
mod suborder;
mod task;

pub use amr::{Amr, AmrStatus};
pub use order::{
    ObjectSelector, Order, OrderId, OrderReceipt, OrderRequest, OrderStatus, DEFAULT_PRIORITY,
};
pub use position::{Position, GOAL_TOLERANCE};
pub use queue::{AmrQueue, ExpectedState};
pub use slot::{slot_label, Slot, SlotHolder, SlotIndex};
pub use station::{Parking, Station, StationStatus};
pub use suborder::{SubOrder, SubOrderId, SubOrderKind, SubOrderStatus};
pub use task::{Task, TaskId, TaskStatus};
