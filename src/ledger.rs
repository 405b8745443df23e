//! Order, suborder and task store.
//!
//! Holds the monotonic id counters, the live maps, the per-robot queues and
//! the history of finished work. Terminal orders never stay live: completed
//! and failed orders move to history together with their suborders, and
//! finished tasks move to history when a robot completes or abandons them.
//!
//! Lookups of suborders and tasks fall back to history, so a task may keep
//! referencing a suborder whose order has already been archived.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::SchedulerError;
use crate::models::{
    AmrQueue, Order, OrderId, OrderStatus, SlotHolder, SubOrder, SubOrderId, SubOrderKind,
    SubOrderStatus, Task, TaskId, TaskStatus,
};
use crate::registry::Registry;

/// Store of all scheduling work.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    next_order: OrderId,
    next_suborder: SubOrderId,
    next_task: TaskId,
    orders: BTreeMap<OrderId, Order>,
    suborders: BTreeMap<SubOrderId, SubOrder>,
    tasks: BTreeMap<TaskId, Task>,
    queues: BTreeMap<String, AmrQueue>,
    order_history: BTreeMap<OrderId, Order>,
    suborder_history: BTreeMap<SubOrderId, SubOrder>,
    task_history: BTreeMap<TaskId, Task>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an empty queue for `amr_id` (no-op if it exists).
    pub fn open_queue(&mut self, amr_id: &str) {
        self.queues.entry(amr_id.to_string()).or_default();
    }

    pub fn queue(&self, amr_id: &str) -> Result<&AmrQueue, SchedulerError> {
        self.queues
            .get(amr_id)
            .ok_or_else(|| SchedulerError::unknown("queue", amr_id))
    }

    pub fn queue_mut(&mut self, amr_id: &str) -> Result<&mut AmrQueue, SchedulerError> {
        self.queues
            .get_mut(amr_id)
            .ok_or_else(|| SchedulerError::unknown("queue", amr_id))
    }

    /// Creates a pending order and its two pending suborders.
    pub fn create_order(
        &mut self,
        object_id: &str,
        source_station: &str,
        destination_station: &str,
        allow_grouping: bool,
        priority: i32,
        tick: u64,
    ) -> OrderId {
        self.next_order += 1;
        let order_id = self.next_order;

        self.next_suborder += 1;
        let pickup_id = self.next_suborder;
        self.next_suborder += 1;
        let delivery_id = self.next_suborder;

        self.suborders.insert(
            pickup_id,
            SubOrder::new(pickup_id, order_id, SubOrderKind::Pickup, source_station, object_id),
        );
        self.suborders.insert(
            delivery_id,
            SubOrder::new(
                delivery_id,
                order_id,
                SubOrderKind::Delivery,
                destination_station,
                object_id,
            ),
        );
        self.orders.insert(
            order_id,
            Order {
                id: order_id,
                object_id: object_id.to_string(),
                source_station: source_station.to_string(),
                destination_station: destination_station.to_string(),
                allow_grouping,
                priority,
                pickup: pickup_id,
                delivery: delivery_id,
                status: OrderStatus::Pending,
                assigned_amr: None,
                created_tick: tick,
                finished_tick: None,
            },
        );
        info!(order = order_id, object = %object_id, source = %source_station,
              destination = %destination_station, "order created");
        order_id
    }

    /// Live order by id.
    pub fn order(&self, id: OrderId) -> Result<&Order, SchedulerError> {
        self.orders
            .get(&id)
            .ok_or_else(|| SchedulerError::unknown("order", id))
    }

    pub fn order_mut(&mut self, id: OrderId) -> Result<&mut Order, SchedulerError> {
        self.orders
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::unknown("order", id))
    }

    /// Live or archived order.
    pub fn find_order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id).or_else(|| self.order_history.get(&id))
    }

    /// Live orders in id order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Archived orders in id order.
    pub fn order_history(&self) -> impl Iterator<Item = &Order> {
        self.order_history.values()
    }

    /// The live order moving `object_id`, if any.
    pub fn live_order_for_object(&self, object_id: &str) -> Option<OrderId> {
        self.orders
            .values()
            .find(|o| o.object_id == object_id)
            .map(|o| o.id)
    }

    /// Live or archived suborder.
    pub fn suborder(&self, id: SubOrderId) -> Result<&SubOrder, SchedulerError> {
        self.suborders
            .get(&id)
            .or_else(|| self.suborder_history.get(&id))
            .ok_or_else(|| SchedulerError::unknown("suborder", id))
    }

    /// Live suborder.
    pub fn suborder_mut(&mut self, id: SubOrderId) -> Result<&mut SubOrder, SchedulerError> {
        self.suborders
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::unknown("suborder", id))
    }

    /// Live suborders in id order.
    pub fn suborders(&self) -> impl Iterator<Item = &SubOrder> {
        self.suborders.values()
    }

    /// The other half of the order `suborder_id` belongs to.
    pub fn sibling(&self, suborder_id: SubOrderId) -> Result<&SubOrder, SchedulerError> {
        let suborder = self.suborder(suborder_id)?;
        let order = self
            .find_order(suborder.order_id)
            .ok_or_else(|| SchedulerError::unknown("order", suborder.order_id))?;
        let sibling = match suborder.kind {
            SubOrderKind::Pickup => order.delivery,
            SubOrderKind::Delivery => order.pickup,
        };
        self.suborder(sibling)
    }

    /// Live or archived task.
    pub fn task(&self, id: TaskId) -> Result<&Task, SchedulerError> {
        self.tasks
            .get(&id)
            .or_else(|| self.task_history.get(&id))
            .ok_or_else(|| SchedulerError::unknown("task", id))
    }

    /// Live task.
    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, SchedulerError> {
        self.tasks
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::unknown("task", id))
    }

    /// Live tasks in id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Archived tasks in id order.
    pub fn task_history(&self) -> impl Iterator<Item = &Task> {
        self.task_history.values()
    }

    /// Suborders of a task, in task order.
    pub fn task_suborders(&self, task_id: TaskId) -> Result<Vec<&SubOrder>, SchedulerError> {
        self.task(task_id)?
            .suborders
            .iter()
            .map(|&id| self.suborder(id))
            .collect()
    }

    /// Creates an empty queued task at the end of `amr_id`'s queue.
    pub fn allocate_task(
        &mut self,
        amr_id: &str,
        station_id: &str,
        tick: u64,
    ) -> Result<TaskId, SchedulerError> {
        let queue = self
            .queues
            .get_mut(amr_id)
            .ok_or_else(|| SchedulerError::unknown("queue", amr_id))?;
        self.next_task += 1;
        let task_id = self.next_task;
        queue.push(task_id);
        self.tasks
            .insert(task_id, Task::new(task_id, amr_id, station_id, tick));
        debug!(amr = %amr_id, task = task_id, station = %station_id, "task allocated");
        Ok(task_id)
    }

    /// Moves a task to history with `status` and drops it from its queue.
    pub fn archive_task(&mut self, task_id: TaskId, status: TaskStatus) -> Result<(), SchedulerError> {
        let mut task = self
            .tasks
            .remove(&task_id)
            .ok_or_else(|| SchedulerError::unknown("task", task_id))?;
        task.status = status;
        if let Some(queue) = self.queues.get_mut(&task.assigned_amr) {
            queue.remove(task_id);
        }
        self.task_history.insert(task_id, task);
        Ok(())
    }

    /// Removes an empty, not yet started task without archiving it.
    ///
    /// Returns `false` (and keeps the task) when it still carries suborders
    /// or has started executing.
    pub fn prune_task(&mut self, task_id: TaskId) -> bool {
        let removable = self
            .tasks
            .get(&task_id)
            .is_some_and(|t| t.suborders.is_empty() && t.accepts_injection());
        if !removable {
            return false;
        }
        if let Some(task) = self.tasks.remove(&task_id) {
            if let Some(queue) = self.queues.get_mut(&task.assigned_amr) {
                queue.remove(task_id);
            }
            debug!(amr = %task.assigned_amr, task = task_id, "empty task dropped");
        }
        true
    }

    /// Detaches a suborder from whatever task carries it.
    ///
    /// Returns the robot owning that task.
    pub fn detach_suborder(&mut self, suborder_id: SubOrderId) -> Result<Option<String>, SchedulerError> {
        let suborder = self.suborder_mut(suborder_id)?;
        let Some(task_id) = suborder.task_id.take() else {
            return Ok(None);
        };
        let task = self.task_mut(task_id)?;
        task.remove_suborder(suborder_id);
        Ok(Some(task.assigned_amr.clone()))
    }

    /// Finalizes an order and moves it, with its suborders, to history.
    ///
    /// A failing order also fails its still-pending half, detaches it from its
    /// task and releases every station reservation tagged with the order.
    /// Returns the robots whose queues changed structurally.
    pub fn finish_order(
        &mut self,
        registry: &mut Registry,
        order_id: OrderId,
        status: OrderStatus,
        tick: u64,
    ) -> Result<Vec<String>, SchedulerError> {
        let mut order = self
            .orders
            .remove(&order_id)
            .ok_or_else(|| SchedulerError::unknown("order", order_id))?;
        order.status = status;
        order.finished_tick = Some(tick);

        let mut touched = Vec::new();
        if status == OrderStatus::Failed {
            for suborder_id in [order.pickup, order.delivery] {
                if self.suborder(suborder_id)?.status != SubOrderStatus::Pending {
                    continue;
                }
                if let Some(amr_id) = self.detach_suborder(suborder_id)? {
                    touched.push(amr_id);
                }
                self.suborder_mut(suborder_id)?.status = SubOrderStatus::Failed;
            }
            for station in registry.stations_mut() {
                station.release_order(order_id);
            }
            let empty: Vec<TaskId> = self
                .tasks
                .values()
                .filter(|t| t.suborders.is_empty() && t.accepts_injection())
                .map(|t| t.id)
                .collect();
            for task_id in empty {
                self.prune_task(task_id);
            }
            warn!(order = order_id, object = %order.object_id, "order failed");
        } else {
            info!(order = order_id, object = %order.object_id,
                  flow_ticks = tick.saturating_sub(order.created_tick), "order completed");
        }

        for suborder_id in [order.pickup, order.delivery] {
            if let Some(suborder) = self.suborders.remove(&suborder_id) {
                self.suborder_history.insert(suborder_id, suborder);
            }
        }
        self.order_history.insert(order_id, order);
        touched.sort();
        touched.dedup();
        Ok(touched)
    }
}
