//! Cost rules, the weighted cost engine and cost-based order assignment.
//!
//! Every candidate robot gets a [`RoutePlan`]: the legs it would drive to
//! serve its queue plus the new order, each leg carrying the number of
//! slot transfers performed on arrival. Cost rules score a plan and the
//! [`CostEngine`] combines them with weights taken from the configuration.
//! The cheapest admissible robot wins.
//!
//! # Usage
//!
//! ```
//! use u_fleet::dispatching::{rules, CostEngine, RoutePlan};
//! use u_fleet::models::Position;
//!
//! let engine = CostEngine::new()
//!     .with_weighted_rule(rules::TravelDistance, 1.0)
//!     .with_weighted_rule(rules::TransferLoad, 20.0);
//!
//! let mut plan = RoutePlan::new("AMR0", Position::new(0.0, 0.0));
//! plan.travel_to(Position::new(30.0, 40.0), 1);
//! assert!((engine.score(&plan) - 70.0).abs() < 1e-10);
//! ```

mod assign;
mod engine;
mod route;
pub mod rules;

pub use assign::{
    assign_order, destination_room, find_injection_points, sort_alternating, Assignment,
    InjectionPoints,
};
pub use engine::CostEngine;
pub use route::{RouteLeg, RoutePlan};

use std::fmt::Debug;

/// Score returned by a cost rule.
///
/// Lower scores = cheaper plan (preferred).
pub type RuleScore = f64;

/// A rule that prices one aspect of a route plan.
///
/// # Score Convention
/// **Lower score = cheaper.** Rules should return non-negative values that
/// grow with the effort the plan demands.
pub trait CostRule: Send + Sync + Debug {
    /// Rule name (e.g., "DIST", "XFER").
    fn name(&self) -> &'static str;

    /// Prices a route plan.
    fn evaluate(&self, plan: &RoutePlan) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
