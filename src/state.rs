use std::collections::{BTreeSet, HashMap};

/// Identity of a state inside one [`StateGraph`]. Sets of states compare and
/// hash by these ids only.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StateId(u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The set of states a simulation occupies. Ordered so that it can be used
/// directly as a cache key.
pub type Frontier = BTreeSet<StateId>;

#[derive(Clone, Debug, Default)]
pub struct State {
    symbol_transitions: HashMap<char, BTreeSet<StateId>>,
    epsilon_transitions: BTreeSet<StateId>,
    wildcard_transitions: BTreeSet<StateId>,
}

impl State {
    /// States reachable by consuming `symbol`, wildcard edges included.
    pub fn next_states(&self, symbol: char) -> impl Iterator<Item = StateId> + '_ {
        self.symbol_transitions
            .get(&symbol)
            .into_iter()
            .flatten()
            .chain(&self.wildcard_transitions)
            .copied()
    }

    pub fn epsilon_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.epsilon_transitions.iter().copied()
    }
}

/// Arena owning every state minted while building one automaton. Edges are
/// ids into the arena, so epsilon cycles need no shared ownership.
#[derive(Clone, Debug, Default)]
pub struct StateGraph {
    states: Vec<State>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self) -> StateId {
        self.states.push(State::default());
        StateId((self.states.len() - 1) as u32)
    }

    pub fn add_symbol_transition(&mut self, from: StateId, to: StateId, symbol: char) {
        self.states[from.index()]
            .symbol_transitions
            .entry(symbol)
            .or_default()
            .insert(to);
    }

    pub fn add_epsilon_transition(&mut self, from: StateId, to: StateId) {
        self.states[from.index()].epsilon_transitions.insert(to);
    }

    pub fn add_wildcard_transition(&mut self, from: StateId, to: StateId) {
        self.states[from.index()].wildcard_transitions.insert(to);
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Every state reachable from `states` through epsilon edges alone,
    /// `states` included.
    pub fn epsilon_closure<I: IntoIterator<Item = StateId>>(&self, states: I) -> Frontier {
        let mut closure = Frontier::new();
        let mut pending: Vec<StateId> = states.into_iter().collect();
        while let Some(id) = pending.pop() {
            if closure.insert(id) {
                pending.extend(
                    self.state(id)
                        .epsilon_states()
                        .filter(|next| !closure.contains(next)),
                );
            }
        }
        closure
    }

    /// States reachable from `frontier` by consuming `symbol`, before closure.
    pub fn step(&self, frontier: &Frontier, symbol: char) -> Frontier {
        frontier
            .iter()
            .flat_map(|id| self.state(*id).next_states(symbol))
            .collect()
    }

    /// Closure of [`StateGraph::step`].
    pub fn advance(&self, frontier: &Frontier, symbol: char) -> Frontier {
        self.epsilon_closure(self.step(frontier, symbol))
    }
}
