//! Weighted cost engine.
//!
//! Combines cost rules into one weighted sum per route plan and picks the
//! cheapest plan.

use std::sync::Arc;

use super::{rules, CostRule, RoutePlan, RuleScore};
use crate::config::FleetConfig;

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn CostRule>,
    weight: f64,
}

/// A composable engine pricing route plans.
///
/// # Example
/// ```
/// use u_fleet::config::FleetConfig;
/// use u_fleet::dispatching::CostEngine;
///
/// let engine = CostEngine::from_config(&FleetConfig::default());
/// assert_eq!(engine.rule_count(), 2);
/// ```
#[derive(Clone)]
pub struct CostEngine {
    rules: Vec<WeightedRule>,
    epsilon: f64,
}

impl CostEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            epsilon: 1e-9,
        }
    }

    /// Distance weighted by `distance_cost`, transfers by `transfer_cost`.
    pub fn from_config(config: &FleetConfig) -> Self {
        Self::new()
            .with_weighted_rule(rules::TravelDistance, config.distance_cost)
            .with_weighted_rule(rules::TransferLoad, config.transfer_cost)
    }

    /// Adds a rule (weight 1.0).
    pub fn with_rule<R: CostRule + 'static>(self, rule: R) -> Self {
        self.with_weighted_rule(rule, 1.0)
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: CostRule + 'static>(mut self, rule: R, weight: f64) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Number of rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Weighted scores of every rule for `plan`.
    pub fn evaluate(&self, plan: &RoutePlan) -> Vec<RuleScore> {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(plan) * wr.weight)
            .collect()
    }

    /// Weighted total cost of `plan`.
    pub fn score(&self, plan: &RoutePlan) -> RuleScore {
        self.evaluate(plan).into_iter().sum()
    }

    /// Index of the cheapest plan. Earlier plans win ties.
    pub fn select_best(&self, plans: &[RoutePlan]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, plan) in plans.iter().enumerate() {
            let score = self.score(plan);
            match best {
                Some((_, best_score)) if score >= best_score - self.epsilon => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(i, _)| i)
    }
}

impl Default for CostEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CostEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
