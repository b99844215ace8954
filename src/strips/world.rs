use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use super::action::{Action, GroundedAction};
use super::condition::{Atom, Condition, GroundedCondition};
use super::matching::State;
use super::parser::{self, Clause, DomainText};
use super::symbol::Symbol;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{}", render_parse_error(.path, .text, .source))]
    Parse {
        path: String,
        /// The offending source line, empty when the input ended early.
        text: String,
        #[source]
        source: parser::Error,
    },
}

impl Error {
    fn parse(path: &str, input: &str, source: parser::Error) -> Self {
        let text = input.lines().nth(source.line.saturating_sub(1)).unwrap_or("").to_owned();
        Error::Parse { path: path.to_owned(), text, source }
    }

    /// Position of a syntax error, if this is one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Error::Parse { source, .. } => Some((source.line, source.col)),
            Error::Io { .. } => None,
        }
    }
}

fn render_parse_error(path: &str, text: &str, e: &parser::Error) -> String {
    let line_number_string = format!("{}", e.line);
    let caret_pos = line_number_string.len() + 2 + e.col;
    format!(
        "{}:{}:{} Error: {}\n\t{}: {}\n\t{:->width$}",
        path, e.line, e.col, e.message, line_number_string, text, '^', width = caret_pos
    )
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("step {step} {action}: precondition {condition} does not hold")]
    PreconditionUnmet {
        step: usize,
        action: String,
        condition: String,
    },
}

/// Parsed and grounded planning problem. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct World {
    facts: BTreeMap<Symbol, BTreeSet<Vec<Symbol>>>,
    goals: Vec<GroundedCondition>,
    known_literals: BTreeSet<Symbol>,
    actions: Vec<Action>,
    /// Every grounding of every action, in declaration order.
    grounds: Vec<GroundedAction>,
}

impl World {
    pub fn from_file(path: impl AsRef<Path>) -> Result<World, Error> {
        let path = path.as_ref();
        let display = path.display().to_string();
        match fs::read_to_string(path) {
            Ok(text) => Self::from_text(&display, &text),
            Err(source) => Err(Error::Io { path: display, source }),
        }
    }

    /// Builds a world from domain text; `path` is only used in error messages.
    pub fn from_text(path: &str, text: &str) -> Result<World, Error> {
        let domain = parser::parse(text).map_err(|e| Error::parse(path, text, e))?;
        WorldBuilder::default().build(domain).map_err(|e| Error::parse(path, text, e))
    }

    pub fn facts(&self) -> &BTreeMap<Symbol, BTreeSet<Vec<Symbol>>> {
        &self.facts
    }

    pub fn goals(&self) -> &[GroundedCondition] {
        &self.goals
    }

    pub fn known_literals(&self) -> &BTreeSet<Symbol> {
        &self.known_literals
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn grounds(&self) -> &[GroundedAction] {
        &self.grounds
    }

    pub fn grounds_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a GroundedAction> + 'a {
        self.grounds.iter().filter(move |g| g.name == name)
    }

    pub fn is_true(&self, atom: &Atom) -> bool {
        match self.facts.get(&atom.predicate) {
            Some(tuples) => tuples.contains(&atom.literals),
            None => false,
        }
    }

    /// Whether `condition` holds in the initial facts.
    pub fn reached(&self, condition: &GroundedCondition) -> bool {
        self.is_true(&condition.atom) == condition.truth
    }

    /// True if the initial facts already satisfy every goal.
    pub fn goal_reached(&self) -> bool {
        self.goals.iter().all(|g| self.reached(g))
    }

    /// The initial facts flattened into a search state.
    pub fn initial_state(&self) -> State {
        self.facts
            .iter()
            .flat_map(|(predicate, tuples)| tuples.iter().map(move |literals| Atom::new(predicate.clone(), literals.clone())))
            .collect()
    }

    /// Replays `plan` forward from the initial facts, checking each precondition
    /// against the evolving state.
    pub fn simulate(&self, plan: &[GroundedAction]) -> Result<State, ExecutionError> {
        let mut state = self.initial_state();
        for (step, action) in plan.iter().enumerate() {
            if let Some(unmet) = action.pre.iter().find(|p| !state.satisfied(p)) {
                return Err(ExecutionError::PreconditionUnmet {
                    step,
                    action: action.to_string(),
                    condition: unmet.to_string(),
                });
            }
            state.update_all(&action.post);
        }
        Ok(state)
    }

    /// True if `plan` executes from the initial facts and ends in a goal state.
    pub fn validates(&self, plan: &[GroundedAction]) -> bool {
        match self.simulate(plan) {
            Ok(state) => state.satisfies_all(&self.goals),
            Err(_) => false,
        }
    }
}

impl FromStr for World {
    type Err = Error;
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        World::from_text("<input>", text)
    }
}

/// Parses `text` and grounds every action.
pub fn build_world(text: &str) -> Result<World, Error> {
    text.parse()
}

#[derive(Default)]
struct WorldBuilder {
    world: World,
}

fn symbols(args: &[&str]) -> Vec<Symbol> {
    args.iter().map(|a| Symbol::new(a)).collect()
}

impl WorldBuilder {
    fn add_literals(&mut self, args: &[&str]) {
        self.world.known_literals.extend(args.iter().map(|a| Symbol::new(a)));
    }

    fn set_true(&mut self, clause: &Clause) {
        self.world.facts.entry(Symbol::new(clause.name)).or_default().insert(symbols(&clause.args));
    }

    fn set_false(&mut self, clause: &Clause) {
        if let Some(tuples) = self.world.facts.get_mut(clause.name) {
            tuples.remove(&symbols(&clause.args));
        }
    }

    fn condition(&mut self, clause: &Clause, params: &[Symbol]) -> Condition {
        // Arguments that are not parameters are domain constants.
        for arg in &clause.args {
            if !params.iter().any(|p| p == arg) {
                self.world.known_literals.insert(Symbol::new(arg));
            }
        }
        Condition::new(clause.name, symbols(&clause.args), !clause.negated)
    }

    fn build(mut self, domain: DomainText) -> Result<World, parser::Error> {
        for clause in &domain.init {
            self.add_literals(&clause.args);
            // Closed world: a negated clause retracts an earlier one, absent facts are already false.
            if clause.negated {
                self.set_false(clause);
            } else {
                self.set_true(clause);
            }
        }

        for clause in &domain.goal {
            self.add_literals(&clause.args);
            let goal = GroundedCondition::new(clause.name, symbols(&clause.args), !clause.negated);
            if !self.world.goals.contains(&goal) {
                self.world.goals.push(goal);
            }
        }

        for decl in &domain.actions {
            let params = symbols(&decl.declaration.args);
            for (idx, param) in params.iter().enumerate() {
                if params[..idx].contains(param) {
                    let span = decl.declaration.span;
                    return Err(parser::Error::new(span.line, span.col, format!("Duplicate parameter '{}' in action {}.", param, decl.declaration.name)));
                }
            }
            let mut action = Action::new(decl.declaration.name, params);
            action.pre = decl.pre.iter().map(|c| self.condition(c, &action.params)).collect();
            action.post = decl.post.iter().map(|c| self.condition(c, &action.params)).collect();
            if self.world.actions.iter().any(|a| a.name == action.name) {
                warn!(action = %action.name, line = decl.declaration.span.line, "duplicate action declaration ignored");
                continue;
            }
            self.world.actions.push(action);
        }

        let literals: Vec<Symbol> = self.world.known_literals.iter().cloned().collect();
        self.world.grounds = self.world.actions.iter().flat_map(|a| a.ground(&literals)).collect();

        debug!(
            facts = self.world.facts.values().map(|t| t.len()).sum::<usize>(),
            goals = self.world.goals.len(),
            literals = literals.len(),
            actions = self.world.actions.len(),
            groundings = self.world.grounds.len(),
            "world built"
        );
        Ok(self.world)
    }
}
