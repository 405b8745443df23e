//! The fleet scheduler context and its tick.
//!
//! # Tick
//!
//! Every tick advances each robot by one step of its state machine:
//!
//! | Robot | Condition | Action |
//! |-------|-----------|--------|
//! | busy | away from goal | step toward the station (or yield) |
//! | busy | at goal, suborder pending | rearrange, then begin it |
//! | busy | at goal, suborder executing | advance it |
//! | busy | at goal, all suborders done | validate, complete the task |
//! | idle | queue has sleeping tasks | try to wake one |
//! | idle | a queued task validates | reserve slots, start it |
//! | idle | nothing to do | head to parking |
//!
//! After the robots, the order sweep archives finished orders and assigns
//! pending ones. The sweep runs even while paused.
//!
//! A fault raised while driving a robot halts that robot and fails its
//! current task; the tick itself never fails.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use rand::Rng;
use tracing::{debug, error, info, warn};

use super::motion::{advance, head_to_parking, must_yield};
use super::snapshot::{AmrRecord, OrderRecord, QueueRecord, StationRecord, SubOrderRecord, TaskRecord};
use super::FleetKpi;
use crate::config::FleetConfig;
use crate::dispatching::{assign_order, sort_alternating, CostEngine};
use crate::error::SchedulerError;
use crate::execution::{advance_suborder, begin_suborder};
use crate::ledger::Ledger;
use crate::models::{
    AmrStatus, OrderId, OrderReceipt, OrderRequest, OrderStatus, Position, StationStatus,
    SubOrderId, SubOrderStatus, TaskId, TaskStatus,
};
use crate::projection::{update_expected_states, validate_amr_state};
use crate::rearrange::{pre_task_validation, rearrange_suborders, wake_task};
use crate::registry::Registry;
use crate::reservation::{amr_slot_reservation, station_slot_reservation};
use crate::validation::{summarize, validate_order};

/// Explicit scheduler context owning the whole fleet state.
///
/// # Example
/// ```
/// use u_fleet::config::FleetConfig;
/// use u_fleet::models::{OrderRequest, Position};
/// use u_fleet::scheduler::FleetScheduler;
///
/// let mut fleet = FleetScheduler::empty(FleetConfig::default()).unwrap();
/// fleet.register_amr("AMR0", Position::new(0.0, 0.0)).unwrap();
/// fleet.register_parking("Parking0", "AMR0", Position::new(0.0, 0.0)).unwrap();
/// fleet.register_station("Dock", Position::new(50.0, 0.0)).unwrap();
/// fleet.register_station("Shelf", Position::new(100.0, 0.0)).unwrap();
/// fleet.place_object("Crate", "Dock", 0).unwrap();
///
/// let receipts = fleet.submit_request(&OrderRequest::new("Crate", "Dock", "Shelf"));
/// assert!(receipts[0].success);
/// ```
#[derive(Debug, Clone)]
pub struct FleetScheduler {
    config: FleetConfig,
    engine: CostEngine,
    registry: Registry,
    ledger: Ledger,
    paused: bool,
    tick: u64,
}

impl FleetScheduler {
    /// Builds the configured fleet with randomized object placement.
    pub fn new(config: FleetConfig) -> Result<Self, SchedulerError> {
        Self::with_rng(config, &mut rand::rng())
    }

    /// Builds the configured fleet using `rng` for object placement.
    pub fn with_rng<R: Rng + ?Sized>(config: FleetConfig, rng: &mut R) -> Result<Self, SchedulerError> {
        config.validate()?;
        let registry = Registry::build(&config, rng)?;
        let mut ledger = Ledger::new();
        for amr_id in registry.amr_ids() {
            ledger.open_queue(&amr_id);
        }
        info!(amrs = config.fleet_size, stations = config.total_stations,
              objects = config.object_count, "fleet built");
        Ok(Self {
            engine: CostEngine::from_config(&config),
            config,
            registry,
            ledger,
            paused: false,
            tick: 0,
        })
    }

    /// Creates a scheduler without any entity, for manual registration.
    pub fn empty(config: FleetConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            engine: CostEngine::from_config(&config),
            config,
            registry: Registry::new(),
            ledger: Ledger::new(),
            paused: false,
            tick: 0,
        })
    }

    /// Replaces the cost engine.
    pub fn with_engine(mut self, engine: CostEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Tears down and rebuilds the whole fleet state.
    pub fn reset(&mut self) -> Result<(), SchedulerError> {
        self.reset_with(&mut rand::rng())
    }

    /// [`reset`](Self::reset) with an explicit random source.
    ///
    /// On error the previous state is kept.
    pub fn reset_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SchedulerError> {
        let rebuilt = Self::with_rng(self.config.clone(), rng)?;
        let engine = std::mem::take(&mut self.engine);
        *self = rebuilt.with_engine(engine);
        info!("fleet reset");
        Ok(())
    }

    // ---- registration ----

    /// Registers a robot with the configured slot capacity and an empty queue.
    pub fn register_amr(
        &mut self,
        id: impl Into<String>,
        position: Position,
    ) -> Result<(), SchedulerError> {
        let id = id.into();
        self.registry
            .register_amr(&id, position, self.config.amr_slot_capacity)?;
        self.ledger.open_queue(&id);
        Ok(())
    }

    /// Registers a station with the configured slot capacity.
    pub fn register_station(
        &mut self,
        id: impl Into<String>,
        position: Position,
    ) -> Result<(), SchedulerError> {
        self.registry
            .register_station(id, position, self.config.station_slot_capacity)
    }

    /// Registers the parking spot of `amr_id`.
    pub fn register_parking(
        &mut self,
        id: impl Into<String>,
        amr_id: &str,
        position: Position,
    ) -> Result<(), SchedulerError> {
        self.registry.register_parking(id, amr_id, position)
    }

    /// Places a new object on a robot or station slot.
    pub fn place_object(
        &mut self,
        object_id: &str,
        holder_id: &str,
        slot: usize,
    ) -> Result<(), SchedulerError> {
        self.registry.place_object(object_id, holder_id, slot)
    }

    // ---- orders ----

    /// Submits one transport order.
    ///
    /// Validation failures are reported in the receipt; nothing is mutated.
    pub fn submit_order(
        &mut self,
        object_id: &str,
        source_station: &str,
        destination_station: &str,
        allow_grouping: bool,
        priority: i32,
    ) -> OrderReceipt {
        if let Err(errors) = validate_order(
            &self.registry,
            &self.ledger,
            object_id,
            source_station,
            destination_station,
        ) {
            let message = summarize(&errors);
            debug!(object = %object_id, %message, "order rejected");
            return OrderReceipt::rejected(message);
        }
        let order_id = self.ledger.create_order(
            object_id,
            source_station,
            destination_station,
            allow_grouping,
            priority,
            self.tick,
        );
        OrderReceipt::accepted(order_id)
    }

    /// Submits a request, one independent order per selected object.
    pub fn submit_request(&mut self, request: &OrderRequest) -> Vec<OrderReceipt> {
        request
            .object_id
            .ids()
            .into_iter()
            .map(|object_id| {
                self.submit_order(
                    object_id,
                    &request.source_station,
                    &request.destination_station,
                    request.allow_grouping,
                    request.priority,
                )
            })
            .collect()
    }

    // ---- tick ----

    /// Advances the fleet by one tick.
    pub fn step(&mut self) {
        self.tick += 1;
        if !self.paused {
            for amr_id in self.registry.amr_ids() {
                if let Err(err) = self.step_amr(&amr_id) {
                    self.fault(&amr_id, &err);
                }
            }
        }
        if let Err(err) = self.sweep_orders() {
            error!(code = err.code(), "order sweep failed: {err}");
        }
    }

    fn step_amr(&mut self, amr_id: &str) -> Result<(), SchedulerError> {
        match self.registry.amr(amr_id)?.status {
            AmrStatus::Error => Ok(()),
            AmrStatus::Busy => {
                self.registry.amr_mut(amr_id)?.busy_ticks += 1;
                self.drive_task(amr_id)
            }
            AmrStatus::Idle => self.idle(amr_id),
        }
    }

    fn drive_task(&mut self, amr_id: &str) -> Result<(), SchedulerError> {
        let amr = self.registry.amr(amr_id)?;
        let Some(task_id) = amr.task_id else {
            self.registry.amr_mut(amr_id)?.status = AmrStatus::Idle;
            return Ok(());
        };

        if !amr.at_goal() {
            if must_yield(&self.registry, amr_id)? {
                debug!(amr = %amr_id, "yielding to an earlier goal claim");
                self.registry.amr_mut(amr_id)?.is_moving = false;
            } else {
                advance(self.registry.amr_mut(amr_id)?, self.config.step_distance);
            }
            return Ok(());
        }
        self.registry.amr_mut(amr_id)?.is_moving = false;

        match self.next_open(task_id)? {
            Some((_, SubOrderStatus::Pending)) => {
                rearrange_suborders(&self.registry, &mut self.ledger, task_id)?;
                update_expected_states(&self.registry, &mut self.ledger, amr_id)?;
                if let Some((suborder_id, _)) = self.next_open(task_id)? {
                    begin_suborder(&self.registry, &mut self.ledger, amr_id, suborder_id)?;
                }
                Ok(())
            }
            Some((suborder_id, _)) => {
                advance_suborder(
                    &self.config,
                    &mut self.registry,
                    &mut self.ledger,
                    amr_id,
                    suborder_id,
                )?;
                Ok(())
            }
            None => self.complete_task(amr_id, task_id),
        }
    }

    /// First non-terminal suborder of a task.
    fn next_open(&self, task_id: TaskId) -> Result<Option<(SubOrderId, SubOrderStatus)>, SchedulerError> {
        Ok(self
            .ledger
            .task_suborders(task_id)?
            .into_iter()
            .find(|s| !s.status.is_terminal())
            .map(|s| (s.id, s.status)))
    }

    fn complete_task(&mut self, amr_id: &str, task_id: TaskId) -> Result<(), SchedulerError> {
        validate_amr_state(&self.registry, &self.ledger, amr_id)?;
        let station_id = self.ledger.task(task_id)?.station_id.clone();
        self.ledger.archive_task(task_id, TaskStatus::Completed)?;
        self.registry.station_mut(&station_id)?.status = StationStatus::Idle;
        let amr = self.registry.amr_mut(amr_id)?;
        amr.status = AmrStatus::Idle;
        amr.task_id = None;
        amr.release_goal();
        update_expected_states(&self.registry, &mut self.ledger, amr_id)?;
        info!(amr = %amr_id, task = task_id, station = %station_id, tick = self.tick,
              "task completed");
        Ok(())
    }

    fn idle(&mut self, amr_id: &str) -> Result<(), SchedulerError> {
        let queue = self.ledger.queue(amr_id)?;
        if queue.is_empty() && self.registry.amr(amr_id)?.is_parked {
            return Ok(());
        }
        let sleeping = queue.tasks.iter().any(|&t| {
            self.ledger
                .task(t)
                .is_ok_and(|task| task.status == TaskStatus::Sleep)
        });
        if sleeping {
            wake_task(&self.config, &self.registry, &mut self.ledger, amr_id, self.tick)?;
        }
        if !self.dispatch_next_task(amr_id)? {
            head_to_parking(&mut self.registry, amr_id, self.config.step_distance, self.tick)?;
        }
        Ok(())
    }

    /// Starts the first queued task that validates. Returns `false` if none.
    fn dispatch_next_task(&mut self, amr_id: &str) -> Result<bool, SchedulerError> {
        let candidates = self.ledger.queue(amr_id)?.tasks.clone();
        for task_id in candidates {
            let queued = self
                .ledger
                .task(task_id)
                .is_ok_and(|t| t.status == TaskStatus::Queued);
            if !queued {
                continue;
            }
            if pre_task_validation(&self.config, &self.registry, &mut self.ledger, task_id, self.tick)? {
                self.start_task(amr_id, task_id)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn start_task(&mut self, amr_id: &str, task_id: TaskId) -> Result<(), SchedulerError> {
        self.ledger.queue_mut(amr_id)?.promote(task_id);
        let station_id = self.ledger.task(task_id)?.station_id.clone();
        self.registry.amr_mut(amr_id)?.task_id = Some(task_id);
        self.registry.station_mut(&station_id)?.status = StationStatus::Busy;

        sort_alternating(&self.registry, &mut self.ledger, task_id)?;
        update_expected_states(&self.registry, &mut self.ledger, amr_id)?;
        amr_slot_reservation(&self.registry, &self.ledger, amr_id, task_id)?;
        station_slot_reservation(&mut self.registry, &self.ledger, task_id)?;

        self.ledger.task_mut(task_id)?.status = TaskStatus::Executing;
        let goal = self.registry.station(&station_id)?.position;
        let amr = self.registry.amr_mut(amr_id)?;
        amr.status = AmrStatus::Busy;
        amr.is_parked = false;
        amr.set_goal(goal, self.tick);
        info!(amr = %amr_id, task = task_id, station = %station_id, tick = self.tick,
              "task started");
        Ok(())
    }

    /// Halts a robot and fails its current task, or the queued task a
    /// deadlock was found in.
    fn fault(&mut self, amr_id: &str, err: &SchedulerError) {
        error!(amr = %amr_id, code = err.code(), tick = self.tick, "robot halted: {err}");
        let task_id = match self.registry.amr_mut(amr_id) {
            Ok(amr) => {
                amr.halt(err.to_string());
                amr.release_goal();
                amr.task_id.take()
            }
            Err(_) => return,
        };
        let task_id = task_id.or(match err {
            SchedulerError::Deadlock { task, .. } => Some(*task),
            _ => None,
        });
        if let Some(task_id) = task_id {
            if let Err(cleanup) = self.abandon_task(amr_id, task_id) {
                error!(amr = %amr_id, task = task_id, "cleanup after fault failed: {cleanup}");
            }
        }
    }

    fn abandon_task(&mut self, amr_id: &str, task_id: TaskId) -> Result<(), SchedulerError> {
        let task = self.ledger.task(task_id)?.clone();
        for &suborder_id in &task.suborders {
            if let Ok(suborder) = self.ledger.suborder_mut(suborder_id) {
                if !suborder.status.is_terminal() {
                    suborder.status = SubOrderStatus::Failed;
                }
            }
        }
        self.ledger.archive_task(task_id, TaskStatus::Failed)?;
        self.registry.station_mut(&task.station_id)?.status = StationStatus::Idle;
        update_expected_states(&self.registry, &mut self.ledger, amr_id)?;
        warn!(amr = %amr_id, task = task_id, "task failed");
        Ok(())
    }

    /// Archives finished orders and assigns pending ones.
    fn sweep_orders(&mut self) -> Result<(), SchedulerError> {
        let mut finished: Vec<(OrderId, OrderStatus)> = Vec::new();
        let mut unassigned: Vec<(Reverse<i32>, OrderId)> = Vec::new();
        for order in self.ledger.orders() {
            let pickup = self.ledger.suborder(order.pickup)?;
            let delivery = self.ledger.suborder(order.delivery)?;
            match (pickup.status, delivery.status) {
                (SubOrderStatus::Completed, SubOrderStatus::Completed) => {
                    finished.push((order.id, OrderStatus::Completed))
                }
                (SubOrderStatus::Failed, _) | (_, SubOrderStatus::Failed) => {
                    finished.push((order.id, OrderStatus::Failed))
                }
                (SubOrderStatus::Pending, _) if pickup.task_id.is_none() => {
                    unassigned.push((Reverse(order.priority), order.id))
                }
                _ => {}
            }
        }

        let mut touched = BTreeSet::new();
        for (order_id, status) in finished {
            touched.extend(
                self.ledger
                    .finish_order(&mut self.registry, order_id, status, self.tick)?,
            );
        }
        for amr_id in touched {
            update_expected_states(&self.registry, &mut self.ledger, &amr_id)?;
        }

        unassigned.sort();
        for (_, order_id) in unassigned {
            if let Err(err) = assign_order(
                &self.config,
                &self.engine,
                &self.registry,
                &mut self.ledger,
                order_id,
                self.tick,
            ) {
                warn!(order = order_id, code = err.code(), "assignment failed: {err}");
            }
        }
        Ok(())
    }

    // ---- control ----

    /// Stops robots from advancing. The order sweep keeps running.
    pub fn pause(&mut self) {
        self.set_paused(true);
    }

    pub fn resume(&mut self) {
        self.set_paused(false);
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            info!(paused, tick = self.tick, "pause toggled");
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Ticks since the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn engine(&self) -> &CostEngine {
        &self.engine
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // ---- inspection ----

    /// Live orders.
    pub fn orders(&self) -> Vec<OrderRecord> {
        self.ledger.orders().map(OrderRecord::from).collect()
    }

    /// Archived orders.
    pub fn order_history(&self) -> Vec<OrderRecord> {
        self.ledger.order_history().map(OrderRecord::from).collect()
    }

    /// Live suborders.
    pub fn suborders(&self) -> Vec<SubOrderRecord> {
        self.ledger.suborders().map(SubOrderRecord::from).collect()
    }

    /// Live tasks.
    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.ledger
            .tasks()
            .filter_map(|t| TaskRecord::build(&self.ledger, t.id).ok())
            .collect()
    }

    /// Archived tasks.
    pub fn task_history(&self) -> Vec<TaskRecord> {
        self.ledger
            .task_history()
            .filter_map(|t| TaskRecord::build(&self.ledger, t.id).ok())
            .collect()
    }

    /// Queue of one robot with its projections.
    pub fn queue(&self, amr_id: &str) -> Result<QueueRecord, SchedulerError> {
        QueueRecord::build(&self.ledger, amr_id)
    }

    pub fn amrs(&self) -> Vec<AmrRecord> {
        self.registry.amrs().map(AmrRecord::from).collect()
    }

    pub fn stations(&self) -> Vec<StationRecord> {
        self.registry.stations().map(StationRecord::from).collect()
    }

    /// Performance indicators since the last reset.
    pub fn kpi(&self) -> FleetKpi {
        FleetKpi::calculate(&self.registry, &self.ledger, self.tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotHolder;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn config() -> FleetConfig {
        FleetConfig::default()
            .with_fleet_size(1)
            .with_stations(2)
            .with_object_count(0)
            .with_step_distance(50.0)
            .with_suborder_duration(2)
    }

    fn tally(holder: &dyn SlotHolder, seen: &mut BTreeMap<String, usize>) {
        assert_eq!(holder.occupied_count() + holder.free_count(), holder.capacity());
        assert_eq!(holder.objects().len(), holder.occupied_count());
        for object in holder.objects() {
            *seen.entry(object).or_default() += 1;
        }
    }

    /// Every object sits in exactly one slot and no slot is double-booked.
    fn assert_physical_invariants(fleet: &FleetScheduler, objects: usize) {
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        for amr in fleet.registry().amrs() {
            tally(amr, &mut seen);
        }
        for station in fleet.registry().stations() {
            tally(station, &mut seen);
        }
        assert_eq!(seen.len(), objects);
        assert!(seen.values().all(|&n| n == 1));

        let mut live = BTreeSet::new();
        for order in fleet.ledger().orders() {
            assert!(live.insert(order.object_id.clone()), "two live orders for one object");
        }
    }

    fn run_until(fleet: &mut FleetScheduler, max_ticks: u64, done: impl Fn(&FleetScheduler) -> bool) {
        for _ in 0..max_ticks {
            if done(fleet) {
                return;
            }
            fleet.step();
        }
        assert!(done(fleet), "condition not reached in {max_ticks} ticks");
    }

    #[test]
    fn test_order_lifecycle() {
        let mut fleet = FleetScheduler::new(config()).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        let receipt = fleet.submit_order("Object01", "Station0", "Station1", true, 100);
        assert!(receipt.success);
        assert_eq!(receipt.message, "Order 1 created.");

        run_until(&mut fleet, 500, |f| !f.order_history().is_empty());
        assert_physical_invariants(&fleet, 1);

        let archived = &fleet.order_history()[0];
        assert_eq!(archived.status, OrderStatus::Completed);
        assert_eq!(archived.assigned_amr.as_deref(), Some("AMR0"));
        assert!(fleet.orders().is_empty());
        assert!(fleet.suborders().is_empty());

        let station = fleet.registry().station("Station1").unwrap();
        assert!(station.holds("Object01"));
        for station in fleet.registry().stations() {
            assert!(station.slots.iter().all(|s| !s.is_reserved()));
            assert_eq!(station.status, StationStatus::Idle);
        }
        let history = fleet.task_history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|t| t.status == TaskStatus::Completed));

        run_until(&mut fleet, 500, |f| f.registry().amr("AMR0").unwrap().is_parked);
        let amr = fleet.registry().amr("AMR0").unwrap();
        assert_eq!(amr.status, AmrStatus::Idle);
        assert!(amr.objects().is_empty());

        let kpi = fleet.kpi();
        assert_eq!(kpi.completed_orders, 1);
        assert!(kpi.avg_flow_ticks > 0.0);
        assert!(kpi.utilization_by_amr["AMR0"] > 0.0);
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let mut fleet = FleetScheduler::new(config()).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        assert!(fleet.submit_order("Object01", "Station0", "Station1", true, 100).success);

        let second = fleet.submit_order("Object01", "Station0", "Station1", true, 100);
        assert!(!second.success);
        assert!(second.message.contains("being processed"));
        assert!(second.order_id.is_none());
        assert_eq!(fleet.orders().len(), 1);
    }

    #[test]
    fn test_invalid_requests() {
        let mut fleet = FleetScheduler::new(config()).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();

        let same = fleet.submit_order("Object01", "Station0", "Station0", true, 100);
        assert!(same.message.contains("both Station0"));
        let unknown = fleet.submit_order("Object01", "Station0", "Station9", true, 100);
        assert!(unknown.message.contains("unknown station Station9"));
        let absent = fleet.submit_order("Object02", "Station0", "Station1", true, 100);
        assert!(absent.message.contains("not found in Station0"));
        assert!(fleet.orders().is_empty());
    }

    #[test]
    fn test_request_with_many_objects() {
        let mut fleet = FleetScheduler::new(config()).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        fleet.place_object("Object02", "Station0", 1).unwrap();
        let request = OrderRequest::new("unused", "Station0", "Station1").with_objects(vec![
            "Object01".into(),
            "Object02".into(),
            "Object03".into(),
        ]);

        let receipts = fleet.submit_request(&request);
        assert_eq!(receipts.len(), 3);
        assert!(receipts[0].success && receipts[1].success);
        assert!(!receipts[2].success);

        run_until(&mut fleet, 1000, |f| f.order_history().len() == 2);
        assert!(fleet
            .order_history()
            .iter()
            .all(|o| o.status == OrderStatus::Completed));
        assert_physical_invariants(&fleet, 2);
    }

    #[test]
    fn test_pause_keeps_sweeping() {
        let mut fleet = FleetScheduler::new(config()).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        fleet.pause();
        fleet.submit_order("Object01", "Station0", "Station1", true, 100);
        let start = fleet.registry().amr("AMR0").unwrap().position;

        for _ in 0..5 {
            fleet.step();
        }
        assert!(fleet.is_paused());
        assert!(fleet.orders()[0].assigned_amr.is_some());
        assert_eq!(fleet.registry().amr("AMR0").unwrap().position, start);

        fleet.resume();
        fleet.step();
        fleet.step();
        assert_ne!(fleet.registry().amr("AMR0").unwrap().position, start);
    }

    #[test]
    fn test_execution_fault_fails_order() {
        let mut fleet = FleetScheduler::new(config().with_suborder_duration(3)).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        fleet.submit_order("Object01", "Station0", "Station1", true, 100);

        run_until(&mut fleet, 500, |f| {
            f.suborders()
                .iter()
                .any(|s| s.status == SubOrderStatus::Executing)
        });
        // The object disappears while the pickup is in progress.
        fleet.registry.station_mut("Station0").unwrap().slots[0].object_id = None;
        run_until(&mut fleet, 10, |f| !f.order_history().is_empty());

        let amr = fleet.registry().amr("AMR0").unwrap();
        assert_eq!(amr.status, AmrStatus::Error);
        assert!(amr.fault.as_deref().unwrap_or("").contains("Object01"));
        assert_eq!(fleet.order_history()[0].status, OrderStatus::Failed);
        assert!(fleet.queue("AMR0").unwrap().tasks.is_empty());
        assert_eq!(fleet.task_history()[0].status, TaskStatus::Failed);
        for station in fleet.registry().stations() {
            assert!(station.slots.iter().all(|s| !s.is_reserved()));
            assert_eq!(station.status, StationStatus::Idle);
        }

        // A halted robot stays put until reset.
        let position = amr.position;
        fleet.step();
        assert_eq!(fleet.registry().amr("AMR0").unwrap().position, position);

        fleet.reset().unwrap();
        assert_eq!(fleet.tick(), 0);
        assert!(fleet.order_history().is_empty());
        assert_eq!(fleet.registry().amr("AMR0").unwrap().status, AmrStatus::Idle);
    }

    #[test]
    fn test_state_mismatch_halts_robot() {
        let mut fleet = FleetScheduler::new(config()).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        fleet.submit_order("Object01", "Station0", "Station1", true, 100);

        run_until(&mut fleet, 500, |f| {
            f.registry().amr("AMR0").unwrap().holds("Object01")
        });
        fleet.place_object("Stray", "AMR0", 2).unwrap();
        run_until(&mut fleet, 5, |f| {
            f.registry().amr("AMR0").unwrap().status == AmrStatus::Error
        });
        let amr = fleet.registry().amr("AMR0").unwrap();
        assert!(amr.fault.as_deref().unwrap_or("").contains("state mismatch"));
    }

    #[test]
    fn test_blocked_delivery_halts_robot() {
        let config = config().with_amr_slots(1).with_station_slots(1);
        let mut fleet = FleetScheduler::new(config).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        fleet.submit_order("Object01", "Station0", "Station1", true, 100);

        run_until(&mut fleet, 500, |f| {
            f.registry().amr("AMR0").unwrap().holds("Object01")
        });
        // The only slot at the destination fills up behind the robot's back.
        fleet.place_object("Object02", "Station1", 0).unwrap();
        run_until(&mut fleet, 50, |f| !f.order_history().is_empty());

        let amr = fleet.registry().amr("AMR0").unwrap();
        assert_eq!(amr.status, AmrStatus::Error);
        assert!(amr.fault.as_deref().unwrap_or("").contains("deadlock"));
        assert!(amr.holds("Object01"));
        assert_eq!(fleet.order_history()[0].status, OrderStatus::Failed);
        assert!(fleet.queue("AMR0").unwrap().tasks.is_empty());
        assert!(fleet
            .task_history()
            .iter()
            .any(|t| t.station_id == "Station1" && t.status == TaskStatus::Failed));
        assert!(fleet
            .registry()
            .station("Station1")
            .unwrap()
            .slots
            .iter()
            .all(|s| !s.is_reserved()));
    }

    #[test]
    fn test_full_destination_waits_for_room() {
        let config = config().with_stations(3).with_station_slots(1);
        let mut fleet = FleetScheduler::new(config).unwrap();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        fleet.place_object("Object02", "Station1", 0).unwrap();
        let blocked = fleet.submit_order("Object01", "Station0", "Station1", true, 100);
        assert!(blocked.success);

        for _ in 0..200 {
            fleet.step();
        }
        let order = fleet.ledger().order(blocked.order_id.unwrap()).unwrap();
        assert!(order.assigned_amr.is_none());
        let amr = fleet.registry().amr("AMR0").unwrap();
        assert_eq!(amr.status, AmrStatus::Idle);
        assert!(amr.objects().is_empty());
        assert!(fleet.registry().station("Station0").unwrap().holds("Object01"));

        // Clearing Station1 lets the first order through.
        assert!(fleet.submit_order("Object02", "Station1", "Station2", true, 100).success);
        run_until(&mut fleet, 2000, |f| f.order_history().len() == 2);
        assert!(fleet
            .order_history()
            .iter()
            .all(|o| o.status == OrderStatus::Completed));
        assert!(fleet.registry().station("Station1").unwrap().holds("Object01"));
        assert!(fleet.registry().station("Station2").unwrap().holds("Object02"));
        assert_physical_invariants(&fleet, 2);
    }

    #[test]
    fn test_priority_orders_assign_first() {
        let config = config().with_fleet_size(2);
        let mut fleet = FleetScheduler::new(config).unwrap();
        fleet.pause();
        fleet.place_object("Object01", "Station0", 0).unwrap();
        fleet.place_object("Object02", "Station0", 1).unwrap();
        let low = fleet.submit_order("Object01", "Station0", "Station1", false, 1);
        let high = fleet.submit_order("Object02", "Station0", "Station1", false, 500);
        fleet.step();

        let high_amr = fleet.ledger().order(high.order_id.unwrap()).unwrap().assigned_amr.clone();
        let low_amr = fleet.ledger().order(low.order_id.unwrap()).unwrap().assigned_amr.clone();
        // Both parking spots are equally far from Station0; the urgent order
        // is priced first and wins the tie.
        assert_eq!(high_amr.as_deref(), Some("AMR0"));
        assert_eq!(low_amr.as_deref(), Some("AMR1"));
    }

    #[test]
    fn test_random_traffic_keeps_invariants() {
        let config = FleetConfig::default()
            .with_step_distance(40.0)
            .with_suborder_duration(3);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut fleet = FleetScheduler::with_rng(config, &mut rng).unwrap();
        let stations = fleet.config().total_stations;

        for t in 0..3000u32 {
            if t % 15 == 0 {
                let placed: Vec<(String, String)> = fleet
                    .registry()
                    .stations()
                    .flat_map(|s| s.objects().into_iter().map(|o| (o, s.id.clone())))
                    .collect();
                if !placed.is_empty() {
                    let (object, source) = placed[rng.random_range(0..placed.len())].clone();
                    let destination = format!("Station{}", rng.random_range(0..stations));
                    let grouping = rng.random_bool(0.7);
                    fleet.submit_order(&object, &source, &destination, grouping, 100);
                }
            }
            fleet.step();
            assert_physical_invariants(&fleet, 10);
            for amr in fleet.registry().amrs() {
                assert_ne!(amr.status, AmrStatus::Error, "{} halted: {:?}", amr.id, amr.fault);
                for object in amr.objects() {
                    assert!(
                        fleet.ledger().live_order_for_object(&object).is_some(),
                        "{object} stranded on {}",
                        amr.id
                    );
                }
                let queue = fleet.ledger().queue(&amr.id).unwrap();
                assert_eq!(queue.tasks.len(), queue.expected_states.len());
            }
        }
        assert!(fleet.kpi().completed_orders > 0);
    }
}
