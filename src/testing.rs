//! Hand-built fleets for unit tests.

use crate::config::FleetConfig;
use crate::ledger::Ledger;
use crate::models::{OrderId, Position, SubOrderId, TaskId};
use crate::projection::update_expected_states;
use crate::registry::Registry;

/// A small fleet laid out on a line: robots at `(0, 100·i)`, stations at
/// `(100·(i+1), 0)`.
pub(crate) struct Fixture {
    pub config: FleetConfig,
    pub registry: Registry,
    pub ledger: Ledger,
}

impl Fixture {
    pub fn new(amrs: usize, stations: usize, station_slots: usize) -> Self {
        let config = FleetConfig::default()
            .with_fleet_size(amrs)
            .with_stations(stations)
            .with_station_slots(station_slots)
            .with_object_count(0);
        Self::with_config(config)
    }

    pub fn with_config(config: FleetConfig) -> Self {
        let mut registry = Registry::new();
        let mut ledger = Ledger::new();
        for i in 0..config.fleet_size {
            let id = format!("AMR{i}");
            let position = Position::new(0.0, 100.0 * i as f64);
            registry
                .register_amr(&id, position, config.amr_slot_capacity)
                .unwrap();
            registry
                .register_parking(format!("Parking{i}"), &id, position)
                .unwrap();
            ledger.open_queue(&id);
        }
        for i in 0..config.total_stations {
            registry
                .register_station(
                    format!("Station{i}"),
                    Position::new(100.0 * (i + 1) as f64, 0.0),
                    config.station_slot_capacity,
                )
                .unwrap();
        }
        Self {
            config,
            registry,
            ledger,
        }
    }

    pub fn place(&mut self, object_id: &str, holder: &str, slot: usize) {
        self.registry.place_object(object_id, holder, slot).unwrap();
    }

    pub fn order(&mut self, object_id: &str, source: &str, destination: &str) -> OrderId {
        self.ledger
            .create_order(object_id, source, destination, true, 100, 0)
    }

    pub fn pickup(&self, order_id: OrderId) -> SubOrderId {
        self.ledger.order(order_id).unwrap().pickup
    }

    pub fn delivery(&self, order_id: OrderId) -> SubOrderId {
        self.ledger.order(order_id).unwrap().delivery
    }

    /// Appends a task carrying `suborders` to `amr_id`'s queue and refreshes
    /// its projection.
    pub fn task(&mut self, amr_id: &str, station_id: &str, suborders: &[SubOrderId]) -> TaskId {
        let task_id = self.ledger.allocate_task(amr_id, station_id, 0).unwrap();
        for &id in suborders {
            self.ledger.task_mut(task_id).unwrap().suborders.push(id);
            let suborder = self.ledger.suborder_mut(id).unwrap();
            suborder.task_id = Some(task_id);
            let order_id = suborder.order_id;
            self.ledger.order_mut(order_id).unwrap().assigned_amr = Some(amr_id.to_string());
        }
        update_expected_states(&self.registry, &mut self.ledger, amr_id).unwrap();
        task_id
    }
}
