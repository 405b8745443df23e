//! Fleet scheduler context, tick loop and reporting.
//!
//! `FleetScheduler` owns every entity and all scheduling work and exposes
//! the operations of the control surface: order submission, stepping,
//! pause/resume, reset and read-only inspection.
//!
//! # Motion
//!
//! Robots move linearly toward their goal. A robot yields while another
//! robot at least as close to the same goal holds an earlier claim on it;
//! there is no other path planning.
//!
//! # KPI
//!
//! `FleetKpi` reports order throughput, flow time in ticks and per-robot
//! utilization.
//!
//! # Concurrency
//!
//! `SharedScheduler` serializes every operation through one mutex, and
//! `TickLoop` steps it from a background thread.

mod fleet;
mod kpi;
mod motion;
mod runtime;
mod snapshot;

pub use fleet::FleetScheduler;
pub use kpi::FleetKpi;
pub use motion::must_yield;
pub use runtime::{SharedScheduler, TickLoop};
pub use snapshot::{
    AmrRecord, OrderRecord, QueueRecord, SlotRecord, StationRecord, SubOrderRecord, TaskRecord,
};
