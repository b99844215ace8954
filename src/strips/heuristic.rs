//! Cheap filters and ordering applied to candidate actions before the search
//! commits to recursing on them.

use std::cmp::Reverse;

use priority_queue::PriorityQueue;

use super::action::GroundedAction;
use super::condition::GroundedCondition;
use super::matching::{strong_match, strong_opposes, State};
use super::world::World;

/// One-hop, whole-domain check: `pre` holds in the initial facts, or some
/// grounding of some action asserts it. May approve preconditions that are never
/// jointly satisfiable; never rejects one a single action could produce.
pub fn precondition_reachable(world: &World, pre: &GroundedCondition) -> bool {
    if world.reached(pre) {
        return true;
    }
    world.grounds().iter().any(|ground| ground.post.iter().any(|p| strong_match(p, pre)))
}

pub fn preconditions_reachable(world: &World, action: &GroundedAction) -> bool {
    action.pre.iter().all(|p| precondition_reachable(world, p))
}

/// Whether any postcondition of `action` falsifies a goal in `goals`,
/// regardless of the order the goals are pursued in.
pub fn contains_contradiction(goals: &[GroundedCondition], action: &GroundedAction) -> bool {
    action.post.iter().any(|post| goals.iter().any(|goal| strong_opposes(post, goal)))
}

/// Number of `preconditions` not satisfied in `state`.
pub fn initial_state_distance(state: &State, preconditions: &[GroundedCondition]) -> usize {
    preconditions.iter().filter(|p| !state.satisfied(p)).count()
}

/// Every grounded action with at least one postcondition strongly matching `goal`.
pub fn get_possible_grounds<'w>(world: &'w World, goal: &GroundedCondition) -> Vec<&'w GroundedAction> {
    world.grounds().iter().filter(|g| g.achieves(goal)).collect()
}

/// Possible grounds for `goal`, closest to `state` first. Ties keep grounding order.
pub fn ranked_candidates<'w>(world: &'w World, state: &State, goal: &GroundedCondition) -> Vec<&'w GroundedAction> {
    let possible = get_possible_grounds(world, goal);
    let mut queue = PriorityQueue::new();
    for (idx, ground) in possible.iter().enumerate() {
        queue.push(idx, Reverse((initial_state_distance(state, &ground.pre), idx)));
    }
    let mut ranked = Vec::with_capacity(queue.len());
    while let Some((idx, _)) = queue.pop() {
        ranked.push(possible[idx]);
    }
    ranked
}

/// Why a candidate was dropped before recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unreachable,
    Contradiction,
}

/// Applies the static filters for a candidate against the full goal list.
pub fn screen(world: &World, goals: &[GroundedCondition], candidate: &GroundedAction) -> Result<(), Rejection> {
    if !preconditions_reachable(world, candidate) {
        return Err(Rejection::Unreachable);
    }
    if contains_contradiction(goals, candidate) {
        return Err(Rejection::Contradiction);
    }
    Ok(())
}
