//! Regular expressions compiled to Thompson NFAs and simulated directly.
//!
//! Patterns use literals, `.` (any symbol), `#` (empty string), `|`, `*`,
//! `!` (complement), grouping and `/x` escapes, plus the shorthands `+`, `?`,
//! `a-z` and `[m,n]`.
//!
//! ```
//! let nfa = relang::compile("(a|cd*)!(a*)").unwrap();
//! assert!(nfa.accepts("aba"));
//! assert!(!nfa.accepts("aa"));
//! ```

mod alphabet;
mod dfa;
mod error;
mod nfa;
mod pattern;
mod regex;
mod state;
mod token;

use std::rc::Rc;

pub use crate::alphabet::{Alphabet, Config, EPSILON, ESCAPE, OPERATORS, SHORTHANDS, WILDCARD};
pub use crate::dfa::DfaGenerator;
pub use crate::error::{PatternError, Result};
pub use crate::nfa::Automaton;
pub use crate::pattern::{add_concatenation_symbols, remove_unnecessary_negations, PatternProcessor};
pub use crate::regex::NfaGenerator;
pub use crate::state::{Frontier, State, StateGraph, StateId};
pub use crate::token::{tokenize, Operator, Token};

/// Compiles `pattern` with the default alphabet and caching.
pub fn compile(pattern: &str) -> Result<Automaton> {
    let automaton = NfaGenerator::new().generate(pattern)?;
    Ok(Rc::unwrap_or_clone(automaton))
}

/// Automaton accepting exactly the strings over `alphabet`'s operating
/// symbols that `automaton` rejects.
pub fn complement(automaton: &Automaton, alphabet: &Alphabet) -> Automaton {
    let result = DfaGenerator::new(alphabet).complement(automaton);
    Rc::unwrap_or_clone(result)
}
