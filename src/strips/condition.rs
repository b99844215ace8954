use std::fmt;

use serde::{Deserialize, Serialize};

use super::symbol::{join_symbols, Symbol};

/// A predicate applied to concrete literals, without a truth value.
/// This is the key that weak matching compares.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Atom {
    pub predicate: Symbol,
    pub literals: Vec<Symbol>,
}

impl Atom {
    pub fn new(predicate: impl Into<Symbol>, literals: Vec<Symbol>) -> Self {
        Self { predicate: predicate.into(), literals }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.predicate, join_symbols(&self.literals))
    }
}

/// Schema-level condition: the parameters are placeholders until grounded.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Condition {
    pub predicate: Symbol,
    pub params: Vec<Symbol>,
    pub truth: bool,
}

impl Condition {
    pub fn new(predicate: impl Into<Symbol>, params: Vec<Symbol>, truth: bool) -> Self {
        Self { predicate: predicate.into(), params, truth }
    }

    /// Substitutes `assignment[i]` for every occurrence of `schema_params[i]`.
    /// Arguments that are not schema parameters are domain constants and stay as written.
    pub fn ground(&self, schema_params: &[Symbol], assignment: &[Symbol]) -> GroundedCondition {
        let literals = self
            .params
            .iter()
            .map(|arg| match schema_params.iter().position(|p| p == arg) {
                Some(idx) => assignment[idx].clone(),
                None => arg.clone(),
            })
            .collect();
        GroundedCondition {
            atom: Atom { predicate: self.predicate.clone(), literals },
            truth: self.truth,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.truth {
            write!(f, "!")?;
        }
        write!(f, "{}({})", self.predicate, join_symbols(&self.params))
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct GroundedCondition {
    pub atom: Atom,
    pub truth: bool,
}

impl GroundedCondition {
    pub fn new(predicate: impl Into<Symbol>, literals: Vec<Symbol>, truth: bool) -> Self {
        Self { atom: Atom::new(predicate, literals), truth }
    }

    pub fn holds(atom: Atom) -> Self {
        Self { atom, truth: true }
    }

    pub fn predicate(&self) -> &Symbol {
        &self.atom.predicate
    }

    pub fn literals(&self) -> &[Symbol] {
        &self.atom.literals
    }

    /// Same atom with the truth value flipped.
    pub fn negated(&self) -> Self {
        Self { atom: self.atom.clone(), truth: !self.truth }
    }
}

impl fmt::Display for GroundedCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.truth {
            write!(f, "!")?;
        }
        write!(f, "{}", self.atom)
    }
}
