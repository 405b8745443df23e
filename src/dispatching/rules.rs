//! Built-in cost rules.
//!
//! | Rule | Score |
//! |------|-------|
//! | DIST | Total driven distance |
//! | XFER | Total suborders handled along the route |

use super::{CostRule, RoutePlan, RuleScore};

/// Total distance driven by the plan.
#[derive(Debug, Clone, Copy)]
pub struct TravelDistance;

impl CostRule for TravelDistance {
    fn name(&self) -> &'static str {
        "DIST"
    }

    fn evaluate(&self, plan: &RoutePlan) -> RuleScore {
        plan.total_distance()
    }

    fn description(&self) -> &'static str {
        "Travel Distance"
    }
}

/// Number of slot transfers performed along the plan.
///
/// Each transfer occupies the robot at a station for a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct TransferLoad;

impl CostRule for TransferLoad {
    fn name(&self) -> &'static str {
        "XFER"
    }

    fn evaluate(&self, plan: &RoutePlan) -> RuleScore {
        plan.total_transfers() as f64
    }

    fn description(&self) -> &'static str {
        "Transfer Load"
    }
}
