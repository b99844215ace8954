//! STRIPS domain reader and goal-regression linear planner.
//!
//! ```no_run
//! use strips_planner::{solve, World};
//!
//! let world = World::from_file("strips-problems/swap.strips").expect("domain loads");
//! if let Some(plan) = solve(&world) {
//!     for action in &plan {
//!         println!("{}", action);
//!     }
//! }
//! ```

pub mod strips;

pub use strips::action::{Action, GroundedAction};
pub use strips::condition::{Atom, Condition, GroundedCondition};
pub use strips::matching::State;
pub use strips::observer::{NullObserver, SearchObserver, TextObserver};
pub use strips::planner::{solve, Outcome, Plan, Planner, PlannerConfig, SearchBudget, SearchReport};
pub use strips::symbol::Symbol;
pub use strips::world::{build_world, World};
