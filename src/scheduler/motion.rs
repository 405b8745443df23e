//! Linear motion and the goal mutual-exclusion rule.
//!
//! Robots move in a straight line toward their goal by a fixed step per
//! tick. The only interaction between robots is a yield: a robot waits while
//! another robot heading to the same goal is at least as close to it (or
//! already there) and claimed it earlier. Claims are ordered by
//! `(goal_timestamp, id)` so two robots never wait on each other.

use crate::error::SchedulerError;
use crate::models::{Amr, GOAL_TOLERANCE};
use crate::registry::Registry;

/// Whether `amr_id` must give way to another robot heading to its goal.
pub fn must_yield(registry: &Registry, amr_id: &str) -> Result<bool, SchedulerError> {
    let amr = registry.amr(amr_id)?;
    let Some(own) = amr.goal_timestamp else {
        return Ok(false);
    };
    let remaining = amr.position.distance_to(&amr.goal);
    Ok(registry.amrs().any(|other| {
        other.id != amr.id
            && other.goal.approx_eq(&amr.goal, GOAL_TOLERANCE)
            && other.position.distance_to(&other.goal) <= remaining
            && other
                .goal_timestamp
                .is_some_and(|ts| (ts, other.id.as_str()) < (own, amr.id.as_str()))
    }))
}

/// Moves `amr` one step toward its goal.
pub fn advance(amr: &mut Amr, step: f64) {
    amr.position = amr.position.step_toward(&amr.goal, step);
    amr.is_moving = true;
    amr.is_parked = false;
}

/// Sends an idle robot home, marking it parked once it arrives.
///
/// Returns `true` if the robot moved.
pub fn head_to_parking(
    registry: &mut Registry,
    amr_id: &str,
    step: f64,
    tick: u64,
) -> Result<bool, SchedulerError> {
    let home = registry.parking(amr_id)?.position;
    let amr = registry.amr_mut(amr_id)?;
    amr.set_goal(home, tick);
    if amr.at_goal() {
        amr.is_parked = true;
        amr.is_moving = false;
        amr.release_goal();
        return Ok(false);
    }
    advance(amr, step);
    Ok(true)
}
