use std::collections::BTreeSet;

pub const EPSILON: char = '#';
pub const WILDCARD: char = '.';
pub const ESCAPE: char = '/';

/// Operators understood by the automaton generator.
pub const OPERATORS: [char; 6] = ['*', '|', '&', '(', ')', '!'];

/// Convenience operators that are expanded before compilation.
pub const SHORTHANDS: [char; 6] = ['?', '+', '[', ']', '-', ','];

/// The set of plain literal symbols a pattern may contain.
///
/// Reserved characters (operators, shorthands, `#`, `.` and `/`) are never
/// literals on their own; a pattern has to escape them with `/`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Alphabet {
    symbols: BTreeSet<char>,
}

impl Alphabet {
    /// Letters and digits.
    pub fn new() -> Self {
        let symbols = ('A'..='Z').chain('a'..='z').chain('0'..='9').collect();
        Self { symbols }
    }

    /// Extends the alphabet with extra literal symbols. Reserved characters
    /// are skipped.
    pub fn with_symbols<I: IntoIterator<Item = char>>(mut self, symbols: I) -> Self {
        self.symbols
            .extend(symbols.into_iter().filter(|c| !Self::is_reserved(*c)));
        self
    }

    pub fn is_reserved(c: char) -> bool {
        OPERATORS.contains(&c)
            || SHORTHANDS.contains(&c)
            || c == EPSILON
            || c == WILDCARD
            || c == ESCAPE
    }

    /// Whether `c` is a plain literal symbol.
    pub fn contains(&self, c: char) -> bool {
        self.symbols.contains(&c)
    }

    /// Whether `c` can ever appear as a matched symbol, either plain or escaped.
    pub fn is_operating(&self, c: char) -> bool {
        self.contains(c) || Self::is_reserved(c)
    }

    /// Every symbol the engine can see: literals plus all reserved characters.
    /// Complementation is total over this set.
    pub fn operating_symbols(&self) -> Vec<char> {
        let mut all = self.symbols.clone();
        all.extend(OPERATORS);
        all.extend(SHORTHANDS);
        all.extend([EPSILON, WILDCARD, ESCAPE]);
        all.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new()
    }
}

/// Knobs shared by the generators.
#[derive(Clone, Debug)]
pub struct Config {
    pub alphabet: Alphabet,
    /// Memoize normalized patterns and compiled automata by pattern text.
    pub cache_patterns: bool,
    /// Memoize complement constructions.
    pub cache_complements: bool,
    /// Initial caching state of every compiled automaton.
    pub cache_transitions: bool,
}

impl Config {
    pub fn without_caching(mut self) -> Self {
        self.cache_patterns = false;
        self.cache_complements = false;
        self.cache_transitions = false;
        self
    }

    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::new(),
            cache_patterns: true,
            cache_complements: true,
            cache_transitions: true,
        }
    }
}
