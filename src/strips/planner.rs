//! Goal-regression linear planner.
//!
//! Goals are satisfied one at a time. An unmet goal picks the closest action
//! that asserts it, recursively plans for that action's preconditions from a
//! copy of the current state, and only adopts the resulting state once the
//! whole branch succeeds. Goals the branch falsified are requeued at the end of
//! the worklist and revisited in the same pass.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::action::GroundedAction;
use super::condition::GroundedCondition;
use super::heuristic::{ranked_candidates, screen, Rejection};
use super::matching::State;
use super::observer::{ItemStyle, NullObserver, SearchObserver, ViewId};
use super::world::World;

/// Actions in execution order; dependencies precede the actions that needed them.
pub type Plan = Vec<GroundedAction>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Deepest precondition recursion tried before a branch is abandoned.
    pub max_depth: usize,
    /// Search calls allowed in one top-level search.
    pub max_expansions: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { max_depth: 15, max_expansions: 1024 }
    }
}

/// Node budget shared by every recursive call of one search.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    limit: usize,
    expansions: usize,
    exhausted: bool,
    depth_limited: bool,
}

impl SearchBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, expansions: 0, exhausted: false, depth_limited: false }
    }

    /// Counts one search call. Returns false once the limit has been used up.
    pub fn try_expand(&mut self) -> bool {
        if self.expansions >= self.limit {
            self.exhausted = true;
            return false;
        }
        self.expansions += 1;
        true
    }

    pub fn expansions(&self) -> usize {
        self.expansions
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// True if either the node budget or the depth bound cut off some branch.
    pub fn limited(&self) -> bool {
        self.exhausted || self.depth_limited
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Solved,
    /// Every branch failed without hitting a bound.
    DeadEnd,
    /// No plan was found and at least one branch was cut off by a bound.
    Exhausted,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub plan: Option<Plan>,
    pub expansions: usize,
    pub outcome: Outcome,
}

/// A goal and its row in the observer's goal view.
type Slot = (GroundedCondition, usize);

/// Plan and resulting state of a successful level.
type Solution = (Plan, State);

pub struct Planner<'w, O: SearchObserver = NullObserver> {
    world: &'w World,
    config: PlannerConfig,
    observer: O,
}

impl<'w> Planner<'w, NullObserver> {
    pub fn new(world: &'w World) -> Self {
        Self { world, config: PlannerConfig::default(), observer: NullObserver }
    }
}

impl<'w, O: SearchObserver> Planner<'w, O> {
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer<P: SearchObserver>(self, observer: P) -> Planner<'w, P> {
        Planner { world: self.world, config: self.config, observer }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Searches for a plan from the world's initial facts to its goals.
    pub fn solve(&mut self) -> Option<Plan> {
        self.search().plan
    }

    pub fn search(&mut self) -> SearchReport {
        let mut budget = SearchBudget::new(self.config.max_expansions);
        let mut trail = Vec::new();
        let initial = self.world.initial_state();
        let goals = self.world.goals().to_vec();
        let result = self.solve_level(initial, goals, 0, &mut budget, &mut trail);

        let plan = result.map(|(plan, _)| plan);
        let outcome = match plan {
            Some(_) => Outcome::Solved,
            None if budget.limited() => Outcome::Exhausted,
            None => Outcome::DeadEnd,
        };
        info!(expansions = budget.expansions(), outcome = ?outcome, steps = ?plan.as_ref().map(Vec::len), "search finished");
        SearchReport { plan, expansions: budget.expansions(), outcome }
    }

    fn solve_level(
        &mut self,
        mut state: State,
        goals: Vec<GroundedCondition>,
        depth: usize,
        budget: &mut SearchBudget,
        trail: &mut Vec<&'w GroundedAction>,
    ) -> Option<Solution> {
        let world = self.world;
        let mut plan = Plan::new();
        if goals.is_empty() {
            return Some((plan, state));
        }
        if depth > self.config.max_depth {
            budget.depth_limited = true;
            trace!(depth, "depth bound reached");
            return None;
        }
        if !budget.try_expand() {
            warn!(limit = budget.limit, "search budget exhausted");
            if self.observer.enabled() {
                self.observer.display_text(&format!("{} recursive calls reached.", budget.limit));
                self.observer.display_text("Aborting search to prevent infinite loop.");
                self.observer.pause("");
            }
            return None;
        }

        let padding = "++".repeat(trail.len()) + " ";
        let goal_view = self.open_goal_view(&goals, depth);
        let mut next_row = goals.len();
        let mut pending: VecDeque<Slot> = goals.into_iter().enumerate().map(|(row, g)| (g, row)).collect();
        let mut achieved: Vec<Slot> = Vec::new();
        let mut visited: HashSet<(State, Vec<GroundedCondition>, usize)> = HashSet::new();

        while let Some((goal, row)) = pending.pop_front() {
            self.report_subgoal(goal_view, row, &padding, &goal, &pending, &state, trail);

            if state.satisfied(&goal) {
                if self.observer.enabled() {
                    self.observer.set_style(goal_view, row, ItemStyle::Completed);
                    self.observer.pause(&format!("{}Satisfied already", padding));
                    self.observer.display_text("");
                }
                achieved.push((goal, row));
                continue;
            }

            // Full goal list in its current order; the pursued goal sits at `achieved.len()`.
            let all_goals: Vec<GroundedCondition> = achieved
                .iter()
                .map(|(g, _)| g.clone())
                .chain(std::iter::once(goal.clone()))
                .chain(pending.iter().map(|(g, _)| g.clone()))
                .collect();
            if !visited.insert((state.clone(), all_goals.clone(), achieved.len())) {
                warn!(depth, goal = %goal, "goal requeue cycle detected, abandoning this goal list");
                if self.observer.enabled() {
                    self.observer.pause(&format!("{}Goal order and state repeat. Backtracking...", padding));
                }
                self.close_goal_view(goal_view, depth);
                return None;
            }

            trace!(depth, goal = %goal, "pursuing subgoal");
            let candidates = ranked_candidates(world, &state, &goal);
            let action_view = self.open_action_view(&candidates, &goal, &padding);

            let mut found: Option<(&'w GroundedAction, Solution)> = None;
            for (idx, candidate) in candidates.iter().copied().enumerate() {
                if self.observer.enabled() {
                    self.observer.set_style(action_view, idx, ItemStyle::Active);
                    self.observer.display_text(&format!("{}Trying next action to satisfy {}:", padding, goal));
                    self.observer.display_text(&format!("{}{}", padding, format!("{:#}", candidate).replace('\n', &format!("\n{}", padding))));
                    self.observer.pause("");
                }

                if let Err(rejection) = screen(world, &all_goals, candidate) {
                    trace!(depth, action = %candidate, ?rejection, "candidate rejected");
                    if self.observer.enabled() {
                        self.observer.set_style(action_view, idx, ItemStyle::Hidden);
                        self.observer.display_text(&match rejection {
                            Rejection::Unreachable => format!("{}Some preconditions not reachable by any possible action. Skipping...", padding),
                            Rejection::Contradiction => format!("{}Action violates another goal state. Skipping...", padding),
                        });
                        self.observer.pause("");
                    }
                    continue;
                }

                if self.observer.enabled() {
                    self.observer.display_text(&format!("{}Action cannot be trivially rejected as unreachable. Descending...", padding));
                    self.observer.pause("");
                }

                trail.push(candidate);
                let result = self.solve_level(state.clone(), candidate.pre.clone(), depth + 1, budget, trail);
                trail.pop();

                match result {
                    Some((sub_plan, mut temp_state)) => {
                        temp_state.update_all(&candidate.post);
                        if self.observer.enabled() {
                            self.observer.set_style(goal_view, row, ItemStyle::Completed);
                            self.observer.display_text(&format!("{}Possible solution found!", padding));
                        }
                        found = Some((candidate, (sub_plan, temp_state)));
                        break;
                    }
                    None => {
                        if self.observer.enabled() {
                            self.observer.set_style(action_view, idx, ItemStyle::Hidden);
                            self.observer.display_text(&format!("{}No solution found with this action. Skipping...", padding));
                        }
                    }
                }
            }

            let (action, (sub_plan, temp_state)) = match found {
                Some(found) => found,
                None => {
                    trace!(depth, goal = %goal, "no candidate satisfies subgoal, backtracking");
                    if self.observer.enabled() {
                        self.observer.display_text("");
                        self.observer.pause(&format!("++{}No actions found to satisfy this subgoal. Backtracking...", padding));
                        self.observer.display_text("");
                        self.observer.remove_view(action_view);
                    }
                    self.close_goal_view(goal_view, depth);
                    return None;
                }
            };

            let (kept, clobbered): (Vec<Slot>, Vec<Slot>) = achieved.into_iter().partition(|(g, _)| temp_state.satisfied(g));
            achieved = kept;
            if !clobbered.is_empty() {
                debug!(
                    depth,
                    action = %action,
                    clobbered = %clobbered.iter().map(|(g, _)| g.to_string()).collect::<Vec<_>>().join(", "),
                    "requeueing clobbered goals"
                );
                self.report_clobbered(&padding, &goal, &clobbered);
            }
            for (g, old_row) in clobbered {
                if self.observer.enabled() {
                    self.observer.add_item(goal_view, &g.to_string());
                    self.observer.clear_style(goal_view, old_row, ItemStyle::Completed);
                    self.observer.set_style(goal_view, old_row, ItemStyle::Hidden);
                }
                pending.push_back((g, next_row));
                next_row += 1;
            }
            if self.observer.enabled() && !pending.is_empty() {
                let order: Vec<String> = achieved
                    .iter()
                    .map(|(g, _)| g.to_string())
                    .chain(std::iter::once(goal.to_string()))
                    .chain(pending.iter().map(|(g, _)| g.to_string()))
                    .collect();
                self.observer.display_text(&format!("{}New goals: {}", padding, order.join(", ")));
            }
            achieved.push((goal, row));

            plan.extend(sub_plan);
            plan.push(action.clone());
            state = temp_state;

            if self.observer.enabled() {
                self.observer.display_text(&format!("{}New State: {}", padding, state));
                self.observer.remove_view(action_view);
            }
        }

        self.close_goal_view(goal_view, depth);
        Some((plan, state))
    }

    fn open_goal_view(&mut self, goals: &[GroundedCondition], depth: usize) -> ViewId {
        if !self.observer.enabled() {
            return 0;
        }
        let items: Vec<String> = goals.iter().map(|g| g.to_string()).collect();
        let hidden: Vec<usize> = (1..goals.len()).collect();
        let title = if depth == 0 { "Goal" } else { "Preconditions" };
        self.observer.add_item_view(title, &items, None, &hidden)
    }

    fn close_goal_view(&mut self, view: ViewId, depth: usize) {
        if depth > 0 && self.observer.enabled() {
            self.observer.remove_view(view);
        }
    }

    fn open_action_view(&mut self, candidates: &[&GroundedAction], goal: &GroundedCondition, padding: &str) -> ViewId {
        if !self.observer.enabled() {
            return 0;
        }
        let items: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
        let view = self.observer.add_item_view("Actions", &items, None, &[]);
        self.observer.display_text(&format!("{}List of possible actions that satisfy {}:", padding, goal));
        for item in &items {
            self.observer.display_text(&format!("{}{}", padding, item));
        }
        view
    }

    #[allow(clippy::too_many_arguments)]
    fn report_subgoal(
        &mut self,
        view: ViewId,
        row: usize,
        padding: &str,
        goal: &GroundedCondition,
        pending: &VecDeque<Slot>,
        state: &State,
        trail: &[&GroundedAction],
    ) {
        if !self.observer.enabled() {
            return;
        }
        let current: Vec<String> = trail.iter().map(|a| a.to_string()).collect();
        let others: Vec<String> = pending.iter().map(|(g, _)| g.to_string()).collect();
        self.observer.clear_style(view, row, ItemStyle::Hidden);
        self.observer.set_style(view, row, ItemStyle::Active);
        self.observer.display_text(&format!("{}Current Plan: {}", padding, current.join(" -> ")));
        self.observer.display_text(&format!("{}Subgoal: {}", padding, goal));
        self.observer.display_text(&format!("{}Other Goals: {}", padding, others.join(", ")));
        self.observer.display_text(&format!("{}State: {}", padding, state));
        self.observer.pause("");
    }

    fn report_clobbered(&mut self, padding: &str, goal: &GroundedCondition, clobbered: &[Slot]) {
        if !self.observer.enabled() {
            return;
        }
        let names: Vec<String> = clobbered.iter().map(|(g, _)| g.to_string()).collect();
        self.observer.display_text(&format!("{}Path satisfies {} but clobbers other goals: {}", padding, goal, names.join(", ")));
        self.observer.display_text(&format!("{}Re-adding the clobbered goals to the end of the list", padding));
        self.observer.pause("");
    }
}

/// Plans from the world's initial facts with the default configuration.
/// `None` means no plan was found within the bounds.
pub fn solve(world: &World) -> Option<Plan> {
    Planner::new(world).solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strips::heuristic::initial_state_distance;
    use crate::strips::observer::TextObserver;
    use crate::strips::world::build_world;

    const SWAP: &str = include_str!("../../strips-problems/swap.strips");
    const CLOBBER: &str = include_str!("../../strips-problems/clobber.strips");
    const BLOCKS: &str = include_str!("../../strips-problems/blocks.strips");
    const UNSATISFIABLE: &str = include_str!("../../strips-problems/unsatisfiable.strips");
    const HANOI: &str = include_str!("../../strips-problems/hanoi.strips");

    const CYCLIC: &str = "init: Idle(S)
goal: Done(S)
actions:
Finish(X)
pre: Ping(X)
post: Done(X)
Ping(X)
pre: Pong(X)
post: Ping(X)
Pong(X)
pre: Ping(X)
post: Pong(X)
";

    const REQUEUE_LOOP: &str = "init: Thing(x)
goal: A(x), B(x)
actions:
MakeA(t)
pre: PrepA(t)
post: A(t), !PrepA(t)
MakeB(t)
pre: PrepB(t)
post: B(t), !PrepB(t)
PrimeA(t)
pre:
post: PrepA(t), !B(t)
PrimeB(t)
pre:
post: PrepB(t), !A(t)
";

    fn names(plan: &[GroundedAction]) -> Vec<String> {
        plan.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_swap() {
        let w = build_world(SWAP).expect("swap builds");
        let plan = solve(&w).expect("swap is solvable");
        assert_eq!(names(&plan), vec!["Stack(A, B)"]);
        let mut state = w.initial_state();
        state.update_all(&plan[0].post);
        assert!(state.satisfies_all(w.goals()));
        assert!(w.validates(&plan));
    }

    #[test]
    fn test_unsatisfiable() {
        let w = build_world(UNSATISFIABLE).expect("fixture builds");
        let report = Planner::new(&w).search();
        assert!(report.plan.is_none());
        assert_eq!(report.outcome, Outcome::DeadEnd);
        assert_eq!(report.expansions, 1);
    }

    #[test]
    fn test_goal_already_reached_gives_empty_plan() {
        let w = build_world("init: P(a), Q(b)\ngoal: P(a), !Q(a)\nactions:\nM(x)\npre: P(x)\npost: Q(x)\n").expect("builds");
        assert!(w.goal_reached());
        assert_eq!(solve(&w), Some(vec![]));
    }

    #[test]
    fn test_clobber_repair() {
        let w = build_world(CLOBBER).expect("fixture builds");
        let plan = solve(&w).expect("clobber fixture is solvable");
        // Soaking the brush on the floor wets it; mopping runs after to restore Dry(Floor).
        assert_eq!(names(&plan), vec!["Soak(Brush, Floor)", "Paint(Wall, Brush)", "Mop(Floor)"]);
        assert!(w.validates(&plan));
        let broken = w.simulate(&plan[..2]).expect("prefix executes");
        assert!(!broken.satisfies_all(w.goals()));
    }

    #[test]
    fn test_blocks_plan_is_forward_ordered() {
        let w = build_world(BLOCKS).expect("fixture builds");
        let plan = solve(&w).expect("blocks fixture is solvable");
        assert_eq!(names(&plan), vec!["MoveToTable(C, A)", "Move(A, Table, B)"]);
        assert!(w.validates(&plan));
        let reversed: Vec<GroundedAction> = plan.iter().rev().cloned().collect();
        assert!(!w.validates(&reversed));
    }

    #[test]
    fn test_cyclic_domain_terminates() {
        let w = build_world(CYCLIC).expect("fixture builds");
        let report = Planner::new(&w).search();
        assert!(report.plan.is_none());
        assert_eq!(report.outcome, Outcome::Exhausted);
        // Finish, then Ping/Pong alternating down to the depth bound.
        assert_eq!(report.expansions, PlannerConfig::default().max_depth + 1);
    }

    #[test]
    fn test_node_budget() {
        let w = build_world(CYCLIC).expect("fixture builds");
        let config = PlannerConfig { max_depth: 100, max_expansions: 5 };
        let report = Planner::new(&w).with_config(config).search();
        assert!(report.plan.is_none());
        assert_eq!(report.outcome, Outcome::Exhausted);
        assert_eq!(report.expansions, 5);
    }

    #[test]
    fn test_budget_is_per_search() {
        let w = build_world(SWAP).expect("swap builds");
        let mut planner = Planner::new(&w).with_config(PlannerConfig { max_depth: 15, max_expansions: 2 });
        for _ in 0..3 {
            let report = planner.search();
            assert_eq!(report.outcome, Outcome::Solved);
            assert_eq!(report.expansions, 2);
        }
    }

    #[test]
    fn test_requeue_cycle_detected() {
        let w = build_world(REQUEUE_LOOP).expect("fixture builds");
        let report = Planner::new(&w).search();
        assert!(report.plan.is_none());
        assert_eq!(report.outcome, Outcome::DeadEnd);
        assert!(report.expansions < PlannerConfig::default().max_expansions);
    }

    #[test]
    fn test_hanoi_two_disks() {
        let w = build_world(HANOI).expect("fixture builds");
        let plan = solve(&w).expect("two disk hanoi is solvable");
        assert_eq!(names(&plan), vec!["Move(D1, D2, P2)", "Move(D2, P1, P3)", "Move(D1, P2, D2)"]);
        assert!(w.validates(&plan));
    }

    #[test]
    fn test_observer_sees_checkpoints() {
        let w = build_world(CLOBBER).expect("fixture builds");
        let mut observer = TextObserver::new(Vec::new(), &b""[..], false);
        let plan = Planner::new(&w).with_observer(&mut observer).solve();
        assert_eq!(plan.map(|p| p.len()), Some(3));
        let trace = String::from_utf8(observer.into_inner()).expect("trace is utf-8");
        assert!(trace.contains("[Goal]"));
        assert!(trace.contains("Subgoal: Painted(Wall)"));
        assert!(trace.contains("Satisfied already"));
        assert!(trace.contains("Path satisfies Painted(Wall) but clobbers other goals: Dry(Floor)"));
        assert!(trace.contains("New goals: Painted(Wall), Dry(Floor)"));
    }

    #[test]
    fn test_observer_does_not_change_result() {
        let w = build_world(BLOCKS).expect("fixture builds");
        let plain = solve(&w);
        let mut observer = TextObserver::new(std::io::sink(), &b""[..], true);
        let traced = Planner::new(&w).with_observer(&mut observer).solve();
        assert_eq!(plain, traced);
    }

    #[test]
    fn test_plan_closes_goal_distance() {
        let w = build_world(CLOBBER).expect("fixture builds");
        assert_eq!(initial_state_distance(&w.initial_state(), w.goals()), 1);
        let plan = solve(&w).expect("solvable");
        let end = w.simulate(&plan).expect("plan executes");
        assert_eq!(initial_state_distance(&end, w.goals()), 0);
    }
}
