use std::fmt;

use serde::Serialize;

use super::condition::{Condition, GroundedCondition};
use super::matching::weak_contains;
use super::symbol::{join_symbols, Symbol};

/// Parameterized action schema as declared in the domain text.
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub name: Symbol,
    pub params: Vec<Symbol>,
    pub pre: Vec<Condition>,
    pub post: Vec<Condition>,
}

impl Action {
    pub fn new(name: impl Into<Symbol>, params: Vec<Symbol>) -> Self {
        Self { name: name.into(), params, pre: Vec::new(), post: Vec::new() }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Every injective assignment of `literals` to the parameters, in order.
    /// A literal is never reused inside one grounding. Too few literals for the
    /// arity simply yields no groundings.
    pub fn ground(&self, literals: &[Symbol]) -> Vec<GroundedAction> {
        fn rec_ground(action: &Action, literals: &[Symbol], used: &mut Vec<bool>, current: &mut Vec<Symbol>, out: &mut Vec<GroundedAction>) {
            if current.len() == action.params.len() {
                out.push(GroundedAction::new(action, current.clone()));
                return;
            }
            for (idx, literal) in literals.iter().enumerate() {
                if used[idx] {
                    continue;
                }
                used[idx] = true;
                current.push(literal.clone());
                rec_ground(action, literals, used, current, out);
                current.pop();
                used[idx] = false;
            }
        }

        let mut out = Vec::new();
        if self.params.len() > literals.len() {
            return out;
        }
        let mut used = vec![false; literals.len()];
        let mut current = Vec::with_capacity(self.params.len());
        rec_ground(self, literals, &mut used, &mut current, &mut out);
        out
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pre: Vec<String> = self.pre.iter().map(|c| c.to_string()).collect();
        let post: Vec<String> = self.post.iter().map(|c| c.to_string()).collect();
        write!(f, "{}({})\nPre: {}\nPost: {}", self.name, join_symbols(&self.params), pre.join(", "), post.join(", "))
    }
}

/// An action schema with concrete literals bound to its parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct GroundedAction {
    pub name: Symbol,
    pub literals: Vec<Symbol>,
    pub pre: Vec<GroundedCondition>,
    pub post: Vec<GroundedCondition>,
    /// `post` plus every precondition no postcondition touches: what is known
    /// to hold right after the action runs.
    #[serde(skip)]
    pub complete_post: Vec<GroundedCondition>,
}

impl GroundedAction {
    pub fn new(action: &Action, literals: Vec<Symbol>) -> Self {
        let pre: Vec<GroundedCondition> = action.pre.iter().map(|c| c.ground(&action.params, &literals)).collect();
        let post: Vec<GroundedCondition> = action.post.iter().map(|c| c.ground(&action.params, &literals)).collect();
        let mut complete_post = post.clone();
        for p in &pre {
            if !weak_contains(&post, p) {
                complete_post.push(p.clone());
            }
        }
        Self { name: action.name.clone(), literals, pre, post, complete_post }
    }

    /// True if any postcondition strongly matches `goal`.
    pub fn achieves(&self, goal: &GroundedCondition) -> bool {
        self.post.iter().any(|p| super::matching::strong_match(p, goal))
    }
}

/// `Name(A, B)`; the alternate form `{:#}` adds the grounded pre and post lists.
impl fmt::Display for GroundedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, join_symbols(&self.literals))?;
        if f.alternate() {
            let pre: Vec<String> = self.pre.iter().map(|c| c.to_string()).collect();
            let post: Vec<String> = self.post.iter().map(|c| c.to_string()).collect();
            write!(f, "\nPre: {}\nPost: {}", pre.join(", "), post.join(", "))?;
        }
        Ok(())
    }
}
