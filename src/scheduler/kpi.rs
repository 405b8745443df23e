//! Fleet performance indicators.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Completed / Failed | Archived orders by final status |
//! | Live | Orders not yet finished |
//! | Avg Flow Time | Mean(finished − created) over completed orders, ticks |
//! | Max Flow Time | Largest single flow time, ticks |
//! | Utilization | Busy ticks / elapsed ticks, per robot |

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ledger::Ledger;
use crate::models::OrderStatus;
use crate::registry::Registry;

/// Fleet performance indicators.
///
/// All time values are in ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetKpi {
    /// Orders archived as completed.
    pub completed_orders: usize,
    /// Orders archived as failed.
    pub failed_orders: usize,
    /// Orders still live.
    pub live_orders: usize,
    /// Mean flow time of completed orders.
    pub avg_flow_ticks: f64,
    /// Largest flow time of any completed order.
    pub max_flow_ticks: u64,
    /// Per-robot utilization (0.0..1.0).
    pub utilization_by_amr: BTreeMap<String, f64>,
    /// Mean robot utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Ticks elapsed since reset.
    pub ticks: u64,
}

impl FleetKpi {
    /// Computes KPIs from the current fleet state.
    pub fn calculate(registry: &Registry, ledger: &Ledger, ticks: u64) -> Self {
        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut total_flow: u64 = 0;
        let mut max_flow: u64 = 0;

        for order in ledger.order_history() {
            match order.status {
                OrderStatus::Completed => {
                    completed += 1;
                    let flow = order.flow_ticks().unwrap_or(0);
                    total_flow += flow;
                    max_flow = max_flow.max(flow);
                }
                OrderStatus::Failed => failed += 1,
                OrderStatus::Pending => {}
            }
        }

        let utilization_by_amr: BTreeMap<String, f64> = registry
            .amrs()
            .map(|amr| {
                let utilization = if ticks == 0 {
                    0.0
                } else {
                    amr.busy_ticks as f64 / ticks as f64
                };
                (amr.id.clone(), utilization)
            })
            .collect();
        let avg_utilization = if utilization_by_amr.is_empty() {
            0.0
        } else {
            utilization_by_amr.values().sum::<f64>() / utilization_by_amr.len() as f64
        };

        let avg_flow_ticks = if completed == 0 {
            0.0
        } else {
            total_flow as f64 / completed as f64
        };

        Self {
            completed_orders: completed,
            failed_orders: failed,
            live_orders: ledger.orders().count(),
            avg_flow_ticks,
            max_flow_ticks: max_flow,
            utilization_by_amr,
            avg_utilization,
            ticks,
        }
    }

    /// Fraction of finished orders that completed. 1.0 when nothing finished.
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed_orders + self.failed_orders;
        if finished == 0 {
            1.0
        } else {
            self.completed_orders as f64 / finished as f64
        }
    }
}
