use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;

use crate::state::{Frontier, StateGraph, StateId};

/// Character span of a component within the canonical pattern.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Set when a component is known to be a complete DFA over the operating
/// alphabet.
#[derive(Clone, Debug)]
pub(crate) struct Deterministic {
    pub states: Vec<StateId>,
    pub inverted: bool,
}

/// A partially built automaton: one start state and its accepting states,
/// living in a shared [`StateGraph`].
#[derive(Clone, Debug)]
pub(crate) struct Component {
    pub initial: StateId,
    pub accepting: BTreeSet<StateId>,
    pub dfa: Option<Deterministic>,
    pub span: Span,
}

impl Component {
    fn two_states(graph: &mut StateGraph, span: Span) -> (Self, StateId) {
        let initial = graph.add_state();
        let accepting = graph.add_state();
        let component = Self {
            initial,
            accepting: BTreeSet::from([accepting]),
            dfa: None,
            span,
        };
        (component, accepting)
    }

    pub fn build_symbol(graph: &mut StateGraph, symbol: char, span: Span) -> Self {
        let (component, accepting) = Self::two_states(graph, span);
        graph.add_symbol_transition(component.initial, accepting, symbol);
        component
    }

    pub fn build_wildcard(graph: &mut StateGraph, span: Span) -> Self {
        let (component, accepting) = Self::two_states(graph, span);
        graph.add_wildcard_transition(component.initial, accepting);
        component
    }

    pub fn build_epsilon(graph: &mut StateGraph, span: Span) -> Self {
        let (component, accepting) = Self::two_states(graph, span);
        graph.add_epsilon_transition(component.initial, accepting);
        component
    }

    /// Accepting states with any pending inversion applied. Components must be
    /// settled before their accepting states get spliced into another one.
    pub fn settle(mut self) -> Self {
        if let Some(dfa) = &mut self.dfa {
            if dfa.inverted {
                self.accepting = dfa
                    .states
                    .iter()
                    .filter(|id| !self.accepting.contains(id))
                    .copied()
                    .collect();
                dfa.inverted = false;
            }
        }
        self
    }

    pub fn build_concat(graph: &mut StateGraph, first: Self, second: Self) -> Self {
        let (first, second) = (first.settle(), second.settle());
        for &state in &first.accepting {
            graph.add_epsilon_transition(state, second.initial);
        }
        Self {
            initial: first.initial,
            accepting: second.accepting,
            dfa: None,
            span: Span::new(first.span.start, second.span.end),
        }
    }

    pub fn build_union(graph: &mut StateGraph, first: Self, second: Self) -> Self {
        let (first, second) = (first.settle(), second.settle());
        let initial = graph.add_state();
        let accepting = graph.add_state();
        graph.add_epsilon_transition(initial, first.initial);
        graph.add_epsilon_transition(initial, second.initial);
        for &state in first.accepting.iter().chain(&second.accepting) {
            graph.add_epsilon_transition(state, accepting);
        }
        Self {
            initial,
            accepting: BTreeSet::from([accepting]),
            dfa: None,
            span: Span::new(first.span.start, second.span.end),
        }
    }

    pub fn build_star(graph: &mut StateGraph, operand: Self, end: usize) -> Self {
        let operand = operand.settle();
        let initial = graph.add_state();
        let accepting = graph.add_state();
        graph.add_epsilon_transition(initial, operand.initial);
        graph.add_epsilon_transition(initial, accepting);
        for &state in &operand.accepting {
            graph.add_epsilon_transition(state, operand.initial);
            graph.add_epsilon_transition(state, accepting);
        }
        Self {
            initial,
            accepting: BTreeSet::from([accepting]),
            dfa: None,
            span: Span::new(operand.span.start, end),
        }
    }

    #[cfg(test)]
    pub fn is_inverted(&self) -> bool {
        self.dfa.as_ref().map_or(false, |dfa| dfa.inverted)
    }
}

static NEXT_AUTOMATON_ID: AtomicU64 = AtomicU64::new(0);

/// A compiled automaton together with the implicit DFA it discovers while
/// simulating.
///
/// The transition cache fills itself from `accepts(&self)`, so it sits behind
/// a `RefCell`. An automaton is meant for one thread at a time.
#[derive(Clone, Debug)]
pub struct Automaton {
    id: u64,
    graph: StateGraph,
    start: StateId,
    accepting: BTreeSet<StateId>,
    inverted: bool,
    is_dfa: bool,
    cache_enabled: Cell<bool>,
    cache: RefCell<HashMap<Frontier, HashMap<char, Frontier>>>,
}

impl Automaton {
    pub(crate) fn from_component(graph: StateGraph, component: Component, caching: bool) -> Self {
        let (inverted, is_dfa) = match &component.dfa {
            Some(dfa) => (dfa.inverted, true),
            None => (false, false),
        };
        Self {
            id: NEXT_AUTOMATON_ID.fetch_add(1, Ordering::Relaxed),
            graph,
            start: component.initial,
            accepting: component.accepting,
            inverted,
            is_dfa,
            cache_enabled: Cell::new(caching && !is_dfa),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The same automaton with the acceptance test flipped. Only meaningful
    /// for a confirmed DFA, where every input leads to exactly one state.
    pub(crate) fn inverted_copy(&self) -> Self {
        Self {
            id: NEXT_AUTOMATON_ID.fetch_add(1, Ordering::Relaxed),
            inverted: !self.inverted,
            cache: RefCell::new(HashMap::new()),
            ..self.clone()
        }
    }

    /// Runs the input through the automaton, one symbol at a time.
    ///
    /// Never fails: symbols the automaton has no edge for simply lead to an
    /// empty frontier and a rejection.
    pub fn accepts(&self, input: &str) -> bool {
        let mut frontier = self.graph.epsilon_closure([self.start]);
        for symbol in input.chars() {
            let next = match self.cached(&frontier, symbol) {
                Some(next) => next,
                None => {
                    let next = self.graph.advance(&frontier, symbol);
                    if self.cache_enabled.get() {
                        self.cache
                            .borrow_mut()
                            .entry(frontier)
                            .or_default()
                            .insert(symbol, next.clone());
                    }
                    next
                }
            };
            if next.is_empty() {
                return false;
            }
            frontier = next;
        }
        self.contains_accepting(&frontier)
    }

    fn cached(&self, frontier: &Frontier, symbol: char) -> Option<Frontier> {
        if !self.cache_enabled.get() {
            return None;
        }
        let hit = self
            .cache
            .borrow()
            .get(frontier)
            .and_then(|row| row.get(&symbol))
            .cloned();
        if hit.is_some() {
            trace!("Transition cache hit on '{}'", symbol);
        }
        hit
    }

    pub fn contains_accepting(&self, frontier: &Frontier) -> bool {
        frontier
            .iter()
            .any(|state| self.inverted != self.accepting.contains(state))
    }

    pub fn enable_caching(&self) {
        self.cache_enabled.set(true);
    }

    /// Stops consulting and filling the cache. Existing entries are kept.
    pub fn disable_caching(&self) {
        self.cache_enabled.set(false);
    }

    pub fn uses_caching(&self) -> bool {
        self.cache_enabled.get()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Number of frontiers with at least one memoized transition.
    pub fn cached_frontiers(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_dfa(&self) -> bool {
        self.is_dfa
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn state_count(&self) -> usize {
        self.graph.len()
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn accepting(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }

    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    /// Identity used by the complement cache. Clones share it.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}
