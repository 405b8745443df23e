//! Fleet task scheduler for autonomous mobile robots (AMRs).
//!
//! Robots move objects between stations that expose a finite number of
//! load-bearing slots. Clients submit transport orders (object, source,
//! destination); the scheduler decides which robot carries each order, in
//! which position of its queue, and serializes every pickup and delivery
//! against slot capacity on both the robot and the stations.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Amr`, `Station`, `Parking`, `Slot`,
//!   `Order`, `SubOrder`, `Task`, `AmrQueue`
//! - **`registry`**: Entity registry, layout and randomized object placement
//! - **`ledger`**: Order/suborder/task store with counters and history
//! - **`validation`**: Order request checks
//! - **`reservation`**: Two-phase (check, commit) slot reservation
//! - **`projection`**: Expected-state projection per queue position
//! - **`dispatching`**: Cost-based order-to-robot assignment
//! - **`execution`**: Suborder state machine (pending → executing → done)
//! - **`rearrange`**: Suborder promotion, pre-task validation, sleep/wake
//! - **`scheduler`**: The `FleetScheduler` context, its tick, inspection
//!   records, KPIs and the threaded tick loop
//!
//! # Example
//!
//! ```
//! use u_fleet::config::FleetConfig;
//! use u_fleet::scheduler::FleetScheduler;
//!
//! let config = FleetConfig::default().with_fleet_size(1).with_object_count(0);
//! let mut fleet = FleetScheduler::new(config).unwrap();
//! fleet.place_object("Object01", "Station0", 0).unwrap();
//!
//! let receipt = fleet.submit_order("Object01", "Station0", "Station1", true, 100);
//! assert!(receipt.success);
//! fleet.step();
//! assert!(fleet.orders()[0].assigned_amr.is_some());
//! ```

pub mod config;
pub mod dispatching;
pub mod error;
pub mod execution;
pub mod ledger;
pub mod models;
pub mod projection;
pub mod rearrange;
pub mod registry;
pub mod reservation;
pub mod scheduler;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use error::SchedulerError;
