//! Static fleet configuration.
//!
//! Fleet size, slot capacities, cost weights and simulation timing are fixed
//! at process start. The struct deserializes from any serde format; missing
//! fields fall back to [`FleetConfig::default`].
//!
//! # Derived limits
//!
//! | Limit | Definition |
//! |-------|-----------|
//! | `pickup_capacity_limit` | max(1, AMR capacity − pickup headroom) |
//! | `max_task_suborders` | max(1, AMR capacity + station capacity − 2) |

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Fleet-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Number of AMRs (and parking spots).
    pub fleet_size: usize,
    /// Number of stations.
    pub total_stations: usize,
    /// Slots per AMR.
    pub amr_slot_capacity: usize,
    /// Slots per station.
    pub station_slot_capacity: usize,
    /// Objects spawned on stations at reset.
    pub object_count: usize,
    /// Cost per unit of travelled distance.
    pub distance_cost: f64,
    /// Cost per suborder handled at a station.
    pub transfer_cost: f64,
    /// Ticks a suborder spends executing before the transfer happens.
    pub suborder_duration: u32,
    /// Distance covered per tick.
    pub step_distance: f64,
    /// Period of the tick loop (ms).
    pub tick_period_ms: u64,
    /// AMR slots kept free when admitting new pickups.
    pub pickup_headroom: usize,
    /// Map width used for layout.
    pub map_width: f64,
    /// Map height used for layout.
    pub map_height: f64,
    /// Parking spot edge length.
    pub parking_size: f64,
    /// Station width.
    pub station_width: f64,
    /// Station height.
    pub station_height: f64,
    /// Gap between neighbouring entities in a layout column.
    pub layout_spacing: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            fleet_size: 3,
            total_stations: 6,
            amr_slot_capacity: 3,
            station_slot_capacity: 4,
            object_count: 10,
            distance_cost: 1.0,
            transfer_cost: 20.0,
            suborder_duration: 10,
            step_distance: 5.0,
            tick_period_ms: 100,
            pickup_headroom: 1,
            map_width: 1200.0,
            map_height: 800.0,
            parking_size: 40.0,
            station_width: 100.0,
            station_height: 80.0,
            layout_spacing: 50.0,
        }
    }
}

impl FleetConfig {
    /// Sets the fleet size.
    pub fn with_fleet_size(mut self, fleet_size: usize) -> Self {
        self.fleet_size = fleet_size;
        self
    }

    /// Sets the station count.
    pub fn with_stations(mut self, total_stations: usize) -> Self {
        self.total_stations = total_stations;
        self
    }

    /// Sets the AMR slot capacity.
    pub fn with_amr_slots(mut self, capacity: usize) -> Self {
        self.amr_slot_capacity = capacity;
        self
    }

    /// Sets the station slot capacity.
    pub fn with_station_slots(mut self, capacity: usize) -> Self {
        self.station_slot_capacity = capacity;
        self
    }

    /// Sets the number of objects spawned at reset.
    pub fn with_object_count(mut self, object_count: usize) -> Self {
        self.object_count = object_count;
        self
    }

    /// Sets the distance and transfer cost weights.
    pub fn with_costs(mut self, distance_cost: f64, transfer_cost: f64) -> Self {
        self.distance_cost = distance_cost;
        self.transfer_cost = transfer_cost;
        self
    }

    /// Sets the per-suborder execution duration (ticks).
    pub fn with_suborder_duration(mut self, ticks: u32) -> Self {
        self.suborder_duration = ticks;
        self
    }

    /// Sets the distance covered per tick.
    pub fn with_step_distance(mut self, step_distance: f64) -> Self {
        self.step_distance = step_distance;
        self
    }

    /// Sets the tick loop period (ms).
    pub fn with_tick_period_ms(mut self, tick_period_ms: u64) -> Self {
        self.tick_period_ms = tick_period_ms;
        self
    }

    /// Sets the number of AMR slots kept free when admitting pickups.
    pub fn with_pickup_headroom(mut self, headroom: usize) -> Self {
        self.pickup_headroom = headroom;
        self
    }

    /// Largest projected AMR load a queue position may reach after a new
    /// pickup is admitted.
    pub fn pickup_capacity_limit(&self) -> usize {
        self.amr_slot_capacity
            .saturating_sub(self.pickup_headroom)
            .max(1)
    }

    /// Upper bound on suborders grouped into one task.
    pub fn max_task_suborders(&self) -> usize {
        (self.amr_slot_capacity + self.station_slot_capacity)
            .saturating_sub(2)
            .max(1)
    }

    /// Checks that the configuration describes a runnable fleet.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.amr_slot_capacity == 0 {
            return Err(SchedulerError::InvalidConfig(
                "amr_slot_capacity must be at least 1".into(),
            ));
        }
        if self.station_slot_capacity == 0 {
            return Err(SchedulerError::InvalidConfig(
                "station_slot_capacity must be at least 1".into(),
            ));
        }
        if self.step_distance.is_nan() || self.step_distance <= 0.0 {
            return Err(SchedulerError::InvalidConfig(
                "step_distance must be positive".into(),
            ));
        }
        if self.tick_period_ms == 0 {
            return Err(SchedulerError::InvalidConfig(
                "tick_period_ms must be positive".into(),
            ));
        }
        if self.distance_cost < 0.0 || self.transfer_cost < 0.0 {
            return Err(SchedulerError::InvalidConfig(
                "cost weights must not be negative".into(),
            ));
        }
        Ok(())
    }
}
