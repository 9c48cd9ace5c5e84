use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use log::{debug, trace};

use crate::alphabet::Alphabet;
use crate::nfa::{Automaton, Component, Deterministic, Span};
use crate::state::{Frontier, StateGraph, StateId};

/// Deterministic transition table produced by subset construction. Rows are
/// subset states, columns follow the generator's symbol order. Row 0 is the
/// start.
#[derive(Debug)]
struct SubsetTable {
    transitions: Vec<Vec<usize>>,
    accepting: Vec<bool>,
}

impl SubsetTable {
    /// Copies the table into `graph` as fresh states.
    fn materialize(&self, graph: &mut StateGraph, symbols: &[char]) -> (StateId, Vec<StateId>) {
        let ids: Vec<StateId> = self.transitions.iter().map(|_| graph.add_state()).collect();
        for (row, targets) in self.transitions.iter().enumerate() {
            for (&symbol, &target) in symbols.iter().zip(targets) {
                graph.add_symbol_transition(ids[row], ids[target], symbol);
            }
        }
        (ids[0], ids)
    }

    fn accepting_states(&self, ids: &[StateId]) -> BTreeSet<StateId> {
        ids.iter()
            .zip(&self.accepting)
            .filter(|(_, accepting)| **accepting)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Builds automata for complement languages.
///
/// Subset construction is exponential in the worst case, so every result is
/// memoized: negations inside patterns by the canonical text of the negated
/// operand, standalone complements by automaton identity.
pub struct DfaGenerator {
    symbols: Vec<char>,
    cache_enabled: bool,
    tables: HashMap<String, Rc<SubsetTable>>,
    complements: HashMap<u64, Rc<Automaton>>,
}

impl DfaGenerator {
    pub fn new(alphabet: &Alphabet) -> Self {
        Self {
            symbols: alphabet.operating_symbols(),
            cache_enabled: true,
            tables: HashMap::new(),
            complements: HashMap::new(),
        }
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn enable_caching(&mut self) {
        self.cache_enabled = true;
    }

    pub fn disable_caching(&mut self) {
        self.cache_enabled = false;
    }

    pub fn clear_cache(&mut self) {
        self.tables.clear();
        self.complements.clear();
    }

    pub(crate) fn cached_tables(&self) -> usize {
        self.tables.len()
    }

    /// Automaton accepting exactly the operating-alphabet strings `automaton`
    /// rejects.
    pub fn complement(&mut self, automaton: &Automaton) -> Rc<Automaton> {
        if self.cache_enabled {
            if let Some(hit) = self.complements.get(&automaton.id()) {
                trace!("Complement cache hit for automaton {}", automaton.id());
                return hit.clone();
            }
        }

        let result = if automaton.is_dfa() {
            automaton.inverted_copy()
        } else {
            let table = self.explore(automaton.graph(), automaton.start(), automaton.accepting());
            let mut graph = StateGraph::new();
            let (initial, states) = table.materialize(&mut graph, &self.symbols);
            let component = Component {
                initial,
                accepting: table.accepting_states(&states),
                dfa: Some(Deterministic {
                    states,
                    inverted: false,
                }),
                span: Span::new(0, 0),
            };
            Automaton::from_component(graph, component, false)
        };

        let result = Rc::new(result);
        if self.cache_enabled {
            self.complements.insert(automaton.id(), result.clone());
        }
        result
    }

    /// Complements a component in place within the graph under construction.
    /// `key` is the canonical text the component was built from.
    pub(crate) fn complement_component(
        &mut self,
        graph: &mut StateGraph,
        component: Component,
        key: &str,
        span: Span,
    ) -> Component {
        if let Some(mut dfa) = component.dfa {
            dfa.inverted = !dfa.inverted;
            return Component {
                dfa: Some(dfa),
                span,
                ..component
            };
        }

        let table = match self.tables.get(key) {
            Some(table) if self.cache_enabled => {
                trace!("Complement cache hit for '{}'", key);
                table.clone()
            }
            _ => {
                let table = Rc::new(self.explore(graph, component.initial, &component.accepting));
                if self.cache_enabled {
                    self.tables.insert(key.to_string(), table.clone());
                }
                table
            }
        };

        let (initial, states) = table.materialize(graph, &self.symbols);
        Component {
            initial,
            accepting: table.accepting_states(&states),
            dfa: Some(Deterministic {
                states,
                inverted: false,
            }),
            span,
        }
    }

    /// Subset construction over every operating symbol. A subset state
    /// accepts iff its subset holds none of the original accepting states, so
    /// the empty subset is an accepting sink.
    fn explore(
        &self,
        graph: &StateGraph,
        start: StateId,
        accepting: &BTreeSet<StateId>,
    ) -> SubsetTable {
        let mut rows_by_subset: HashMap<Frontier, usize> = HashMap::new();
        let mut subsets_by_row: Vec<Frontier> = Vec::new();
        let mut table = SubsetTable {
            transitions: Vec::new(),
            accepting: Vec::new(),
        };

        let initial = graph.epsilon_closure([start]);
        table.accepting.push(initial.is_disjoint(accepting));
        rows_by_subset.insert(initial.clone(), 0);
        subsets_by_row.push(initial);

        let mut pending = VecDeque::from([0usize]);
        while let Some(row) = pending.pop_front() {
            let mut targets = Vec::with_capacity(self.symbols.len());
            for &symbol in &self.symbols {
                let reachable = graph.advance(&subsets_by_row[row], symbol);
                let target = match rows_by_subset.get(&reachable) {
                    Some(&target) => target,
                    None => {
                        let target = subsets_by_row.len();
                        table.accepting.push(reachable.is_disjoint(accepting));
                        rows_by_subset.insert(reachable.clone(), target);
                        subsets_by_row.push(reachable);
                        pending.push_back(target);
                        target
                    }
                };
                targets.push(target);
            }
            // Rows are numbered in discovery order and explored FIFO.
            debug_assert_eq!(table.transitions.len(), row);
            table.transitions.push(targets);
        }

        debug!(
            "Subset construction produced {} states from {} source states",
            subsets_by_row.len(),
            graph.len()
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::NfaGenerator;

    const SAMPLES: [&str; 10] = ["", "a", "b", "aa", "ab", "ba", "abc", "cab", "aaab", "bbbb"];

    #[test]
    fn test_complement_of_symbol() -> Result<()> {
        let mut generator = NfaGenerator::new();
        let a = generator.generate("a")?;
        let mut dfas = DfaGenerator::new(&Alphabet::new());
        let not_a = dfas.complement(&a);
        assert!(not_a.is_dfa());
        assert!(!not_a.uses_caching());
        assert!(!not_a.accepts("a"));
        assert!(not_a.accepts(""));
        assert!(not_a.accepts("bb"));
        assert!(not_a.accepts("aa"));
        Ok(())
    }

    #[test]
    fn test_complement_is_total_over_operators() -> Result<()> {
        let mut generator = NfaGenerator::new();
        let a = generator.generate("a")?;
        let not_a = DfaGenerator::new(&Alphabet::new()).complement(&a);
        assert!(not_a.accepts("*"));
        assert!(not_a.accepts("a|b"));
        assert!(not_a.accepts("(/)"));
        Ok(())
    }

    #[test]
    fn test_double_complement() -> Result<()> {
        let mut generator = NfaGenerator::new();
        let mut dfas = DfaGenerator::new(&Alphabet::new());
        for pattern in ["ab*", "(a|b)c", "a?b+", "!(ab)"] {
            let original = generator.generate(pattern)?;
            let once = dfas.complement(&original);
            let twice = dfas.complement(&once);
            assert!(twice.is_dfa());
            for sample in SAMPLES {
                let expected = original.accepts(sample);
                assert_eq!(twice.accepts(sample), expected, "{} on '{}'", pattern, sample);
                assert_ne!(once.accepts(sample), expected, "{} on '{}'", pattern, sample);
            }
        }
        Ok(())
    }

    #[test]
    fn test_complement_cached_by_identity() -> Result<()> {
        let mut generator = NfaGenerator::new();
        let nfa = generator.generate("a*b")?;
        let mut dfas = DfaGenerator::new(&Alphabet::new());
        let first = dfas.complement(&nfa);
        let second = dfas.complement(&nfa);
        assert!(Rc::ptr_eq(&first, &second));

        dfas.disable_caching();
        let third = dfas.complement(&nfa);
        assert!(!Rc::ptr_eq(&first, &third));
        Ok(())
    }

    #[test]
    fn test_subset_states_are_shared() {
        // Two branches on the same symbol reach one subset, not two states.
        let mut graph = StateGraph::new();
        let start = graph.add_state();
        let left = graph.add_state();
        let right = graph.add_state();
        graph.add_symbol_transition(start, left, 'a');
        graph.add_symbol_transition(start, right, 'a');

        let dfas = DfaGenerator::new(&Alphabet::new());
        let table = dfas.explore(&graph, start, &BTreeSet::from([left]));
        // {start}, {left, right} and the empty sink.
        assert_eq!(table.transitions.len(), 3);
        assert_eq!(table.accepting.iter().filter(|a| **a).count(), 2);
        let on_a = dfas.symbols.iter().position(|c| *c == 'a').unwrap();
        let after_a = table.transitions[0][on_a];
        assert!(!table.accepting[after_a]);
        assert_eq!(table.transitions[after_a][on_a], table.transitions[0][0]);
    }
}
