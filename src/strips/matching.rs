//! Comparison primitives over grounded conditions and the working search state.
//!
//! The state only records true atoms (closed world), so a negative condition
//! holds exactly when its atom is absent.

use std::collections::BTreeSet;
use std::fmt;

use super::condition::{Atom, GroundedCondition};

/// Same predicate and the same literal tuple; the truth value is ignored.
/// Tuples of different length never match.
#[inline]
pub fn weak_match(a: &GroundedCondition, b: &GroundedCondition) -> bool {
    a.atom == b.atom
}

#[inline]
pub fn strong_match(a: &GroundedCondition, b: &GroundedCondition) -> bool {
    a.truth == b.truth && weak_match(a, b)
}

/// Weak match with the opposite truth value, i.e. `a` asserts what `b` retracts or vice versa.
#[inline]
pub fn strong_opposes(a: &GroundedCondition, b: &GroundedCondition) -> bool {
    a.truth != b.truth && weak_match(a, b)
}

pub fn weak_find<'a>(items: &'a [GroundedCondition], target: &GroundedCondition) -> Option<&'a GroundedCondition> {
    items.iter().find(|item| weak_match(item, target))
}

pub fn weak_contains(items: &[GroundedCondition], target: &GroundedCondition) -> bool {
    weak_find(items, target).is_some()
}

/// Set of true atoms. Keyed by atom, so two entries can never share a
/// (predicate, literal-tuple) key.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct State(BTreeSet<Atom>);

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, atom: &Atom) -> bool {
        self.0.contains(atom)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.0.iter()
    }

    /// Grounded view of the state, every entry with `truth == true`.
    pub fn conditions(&self) -> impl Iterator<Item = GroundedCondition> + '_ {
        self.0.iter().cloned().map(GroundedCondition::holds)
    }

    pub fn satisfied(&self, goal: &GroundedCondition) -> bool {
        self.0.contains(&goal.atom) == goal.truth
    }

    pub fn satisfies_all<'a>(&self, goals: impl IntoIterator<Item = &'a GroundedCondition>) -> bool {
        goals.into_iter().all(|g| self.satisfied(g))
    }

    /// Applies one postcondition: asserts add a missing atom, retractions remove a present one.
    /// Anything else is a no-op, so applying the same postcondition twice changes nothing.
    pub fn update(&mut self, post: &GroundedCondition) {
        if post.truth {
            if !self.0.contains(&post.atom) {
                self.0.insert(post.atom.clone());
            }
        } else {
            self.0.remove(&post.atom);
        }
    }

    pub fn update_all<'a>(&mut self, posts: impl IntoIterator<Item = &'a GroundedCondition>) {
        posts.into_iter().for_each(|p| self.update(p));
    }
}

impl FromIterator<Atom> for State {
    fn from_iter<T: IntoIterator<Item = Atom>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.0.iter().take(1).fold(String::new(), |acc, item| acc + &format!("{}", item));
        let all = self.0.iter().skip(1).fold(first, |acc, item| acc + ", " + &format!("{}", item));
        write!(f, "{}", all)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State({})", self)
    }
}

/// Whether `goal` holds in `state`: presence proves truth, absence proves falsity.
pub fn satisfied(state: &State, goal: &GroundedCondition) -> bool {
    state.satisfied(goal)
}

pub fn update_state(state: &mut State, post: &GroundedCondition) {
    state.update(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strips::symbol::Symbol;
    use proptest::prelude::*;

    fn gc(predicate: &str, literals: &[&str], truth: bool) -> GroundedCondition {
        GroundedCondition::new(predicate, literals.iter().map(|l| Symbol::new(l)).collect(), truth)
    }

    #[test]
    fn test_weak_match_ignores_truth() {
        assert!(weak_match(&gc("On", &["A", "B"], true), &gc("On", &["A", "B"], false)));
        assert!(!strong_match(&gc("On", &["A", "B"], true), &gc("On", &["A", "B"], false)));
        assert!(strong_opposes(&gc("On", &["A", "B"], true), &gc("On", &["A", "B"], false)));
    }

    #[test]
    fn test_weak_match_length_mismatch() {
        assert!(!weak_match(&gc("On", &["A"], true), &gc("On", &["A", "B"], true)));
        assert!(!weak_match(&gc("On", &[], true), &gc("On", &["A"], true)));
    }

    #[test]
    fn test_weak_match_order_matters() {
        assert!(!weak_match(&gc("On", &["A", "B"], true), &gc("On", &["B", "A"], true)));
        assert!(!weak_match(&gc("On", &["A", "B"], true), &gc("Over", &["A", "B"], true)));
    }

    #[test]
    fn test_weak_find_returns_first() {
        let items = vec![gc("Clear", &["A"], true), gc("On", &["A", "B"], false), gc("On", &["A", "B"], true)];
        assert_eq!(weak_find(&items, &gc("On", &["A", "B"], true)), Some(&items[1]));
        assert_eq!(weak_find(&items, &gc("Clear", &["B"], true)), None);
        assert!(weak_contains(&items, &gc("Clear", &["A"], false)));
    }

    #[test]
    fn test_satisfied_closed_world() {
        let mut state = State::new();
        state.update(&gc("Clear", &["A"], true));
        assert!(satisfied(&state, &gc("Clear", &["A"], true)));
        assert!(!satisfied(&state, &gc("Clear", &["A"], false)));
        assert!(satisfied(&state, &gc("Clear", &["B"], false)));
        assert!(!satisfied(&state, &gc("Clear", &["B"], true)));
    }

    #[test]
    fn test_update_state() {
        let mut state = State::new();
        update_state(&mut state, &gc("On", &["A", "B"], true));
        assert_eq!(state.len(), 1);
        update_state(&mut state, &gc("On", &["A", "C"], false));
        assert_eq!(state.len(), 1);
        update_state(&mut state, &gc("On", &["A", "B"], false));
        assert!(state.is_empty());
    }

    #[test]
    fn test_state_display() {
        let mut state = State::new();
        assert_eq!(state.to_string(), "");
        state.update(&gc("On", &["A", "B"], true));
        state.update(&gc("Clear", &["A"], true));
        assert_eq!(state.to_string(), "Clear(A), On(A, B)");
    }

    fn arb_condition() -> impl Strategy<Value = GroundedCondition> {
        (
            prop::sample::select(vec!["On", "Clear", "Holding"]),
            prop::collection::vec(prop::sample::select(vec!["A", "B", "C"]), 0..3),
            any::<bool>(),
        )
            .prop_map(|(p, lits, truth)| gc(p, &lits, truth))
    }

    proptest! {
        #[test]
        fn prop_matching_is_symmetric(a in arb_condition(), b in arb_condition()) {
            prop_assert_eq!(weak_match(&a, &b), weak_match(&b, &a));
            prop_assert_eq!(strong_match(&a, &b), strong_match(&b, &a));
        }

        #[test]
        fn prop_update_is_idempotent(
            initial in prop::collection::vec(arb_condition(), 0..6),
            post in arb_condition(),
        ) {
            let mut state = State::new();
            state.update_all(&initial);
            let mut once = state.clone();
            once.update(&post);
            let mut twice = once.clone();
            twice.update(&post);
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.satisfied(&post));
        }
    }
}
