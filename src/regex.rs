use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::alphabet::{Alphabet, Config, EPSILON, ESCAPE};
use crate::dfa::DfaGenerator;
use crate::error::{PatternError, Result};
use crate::nfa::{Automaton, Component, Span};
use crate::pattern::PatternProcessor;
use crate::state::StateGraph;
use crate::token::{tokenize, Operator, Token};

/// Compiles patterns into automata.
///
/// Holds the caches that outlive a single compilation: normalized patterns,
/// compiled automata keyed by their canonical form, and complement tables.
pub struct NfaGenerator {
    processor: PatternProcessor,
    complements: DfaGenerator,
    cache: HashMap<String, Rc<Automaton>>,
    config: Config,
}

impl NfaGenerator {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            processor: PatternProcessor::new(config.alphabet.clone())
                .with_caching(config.cache_patterns),
            complements: DfaGenerator::new(&config.alphabet).with_caching(config.cache_complements),
            cache: HashMap::new(),
            config,
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.config.alphabet
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn generate(&mut self, pattern: &str) -> Result<Rc<Automaton>> {
        let canonical = self.processor.elongate(pattern)?;
        if self.config.cache_patterns {
            if let Some(hit) = self.cache.get(&canonical) {
                trace!("Automaton cache hit for '{}'", canonical);
                return Ok(hit.clone());
            }
        }

        let tokens = tokenize(&canonical, &self.config.alphabet)?;
        let source: Vec<char> = canonical.chars().collect();
        let (graph, component) = Evaluator::new(&mut self.complements, &source).run(&tokens)?;
        let automaton = Rc::new(Automaton::from_component(
            graph,
            component,
            self.config.cache_transitions,
        ));
        debug!(
            "Compiled '{}' into {} states (dfa: {})",
            pattern,
            automaton.state_count(),
            automaton.is_dfa()
        );

        if self.config.cache_patterns {
            self.cache.insert(canonical, automaton.clone());
        }
        Ok(automaton)
    }

    /// Complement of an already compiled automaton.
    pub fn complement(&mut self, automaton: &Automaton) -> Rc<Automaton> {
        self.complements.complement(automaton)
    }

    pub fn cached_patterns(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.complements.clear_cache();
    }
}

impl Default for NfaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

struct Pending {
    operator: Operator,
    position: usize,
    /// Operand count when the operator was pushed.
    depth: usize,
}

/// Operator-precedence evaluation of one canonical pattern. All components
/// share a private graph that becomes the compiled automaton.
struct Evaluator<'a> {
    graph: StateGraph,
    operands: Vec<Component>,
    operators: Vec<Pending>,
    complements: &'a mut DfaGenerator,
    source: &'a [char],
}

impl<'a> Evaluator<'a> {
    fn new(complements: &'a mut DfaGenerator, source: &'a [char]) -> Self {
        Self {
            graph: StateGraph::new(),
            operands: Vec::new(),
            operators: Vec::new(),
            complements,
            source,
        }
    }

    fn run(mut self, tokens: &[(usize, Token)]) -> Result<(StateGraph, Component)> {
        for &(position, token) in tokens {
            let span = Span::new(position, position + 1);
            match token {
                Token::Symbol(symbol) => {
                    // Escaped symbols cover the escape marker too.
                    let span = Span::new(position, self.symbol_end(position));
                    let component = Component::build_symbol(&mut self.graph, symbol, span);
                    self.operands.push(component);
                }
                Token::Wildcard => {
                    let component = Component::build_wildcard(&mut self.graph, span);
                    self.operands.push(component);
                }
                Token::Epsilon => {
                    let component = Component::build_epsilon(&mut self.graph, span);
                    self.operands.push(component);
                }
                Token::Operator(Operator::Close) => self.close_group(position)?,
                Token::Operator(operator) => {
                    while let Some(top) = self.operators.last() {
                        if !top.operator.has_precedence_over(operator) {
                            break;
                        }
                        self.evaluate()?;
                    }
                    self.operators.push(Pending {
                        operator,
                        position,
                        depth: self.operands.len(),
                    });
                }
            }
        }

        while !self.operators.is_empty() {
            self.evaluate()?;
        }

        let component = self.operands.pop().ok_or(PatternError::EmptyOperandStack {
            operator: EPSILON,
            position: 0,
        })?;
        if !self.operands.is_empty() {
            return Err(PatternError::MissingOperator {
                position: component.span.start,
            });
        }
        Ok((self.graph, component))
    }

    fn symbol_end(&self, position: usize) -> usize {
        if self.source.get(position) == Some(&ESCAPE) {
            position + 2
        } else {
            position + 1
        }
    }

    /// Evaluates everything back to the matching `(` and drops it. The
    /// operand left on top now spans the parentheses.
    fn close_group(&mut self, position: usize) -> Result<()> {
        loop {
            match self.operators.last() {
                None => return Err(PatternError::UnbalancedParentheses { position }),
                Some(top) if top.operator == Operator::Open => break,
                Some(_) => self.evaluate()?,
            }
        }
        let open = self
            .operators
            .pop()
            .ok_or(PatternError::UnbalancedParentheses { position })?;
        if self.operands.len() <= open.depth {
            return Err(PatternError::EmptyOperandStack {
                operator: Operator::Close.as_char(),
                position,
            });
        }
        if let Some(top) = self.operands.last_mut() {
            top.span = Span::new(open.position, position + 1);
        }
        Ok(())
    }

    /// Operands available to the operator being evaluated, i.e. those pushed
    /// after the innermost unmatched `(`.
    fn pop_operand(&mut self, operator: Operator, position: usize) -> Result<Component> {
        let floor = self
            .operators
            .iter()
            .rev()
            .find(|pending| pending.operator == Operator::Open)
            .map_or(0, |pending| pending.depth);
        if self.operands.len() <= floor {
            return Err(PatternError::EmptyOperandStack {
                operator: operator.as_char(),
                position,
            });
        }
        self.operands
            .pop()
            .ok_or(PatternError::EmptyOperandStack {
                operator: operator.as_char(),
                position,
            })
    }

    fn evaluate(&mut self) -> Result<()> {
        let Pending {
            operator, position, ..
        } = match self.operators.pop() {
            Some(pending) => pending,
            None => return Ok(()),
        };

        let result = match operator {
            Operator::Open | Operator::Close => {
                return Err(PatternError::UnbalancedParentheses { position })
            }
            Operator::Concat => {
                let second = self.pop_operand(operator, position)?;
                let first = self.pop_operand(operator, position)?;
                Component::build_concat(&mut self.graph, first, second)
            }
            Operator::Union => {
                let second = self.pop_operand(operator, position)?;
                let first = self.pop_operand(operator, position)?;
                Component::build_union(&mut self.graph, first, second)
            }
            Operator::Star => {
                let operand = self.pop_operand(operator, position)?;
                Component::build_star(&mut self.graph, operand, position + 1)
            }
            Operator::Not => {
                let operand = self.pop_operand(operator, position)?;
                let key: String = self.source[operand.span.start..operand.span.end]
                    .iter()
                    .collect();
                let span = Span::new(position, operand.span.end);
                self.complements
                    .complement_component(&mut self.graph, operand, &key, span)
            }
        };
        self.operands.push(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str) -> Result<Rc<Automaton>> {
        NfaGenerator::new().generate(pattern)
    }

    fn check(pattern: &str, accepted: &[&str], rejected: &[&str]) -> Result<()> {
        let nfa = compile(pattern)?;
        for input in accepted {
            assert!(nfa.accepts(input), "'{}' should accept '{}'", pattern, input);
        }
        for input in rejected {
            assert!(!nfa.accepts(input), "'{}' should reject '{}'", pattern, input);
        }
        Ok(())
    }

    #[test]
    fn test_empty_pattern() -> Result<()> {
        check("", &[""], &["a"])
    }

    #[test]
    fn test_literal() -> Result<()> {
        check("a", &["a"], &["b", "", "abbbcabb*"])
    }

    #[test]
    fn test_literal_concat() -> Result<()> {
        check("ab", &["ab"], &["", "a", "b", "ba", "abb"])
    }

    #[test]
    fn test_alt() -> Result<()> {
        check("a|b", &["a", "b"], &["", "ab"])
    }

    #[test]
    fn test_star() -> Result<()> {
        check("a*", &["", "a", "aaaa"], &["b", "bb", "ab"])
    }

    #[test]
    fn test_parentheses_change_order() -> Result<()> {
        check("ab*", &["a", "abbb"], &["abab"])?;
        check("(ab)*", &["", "abab"], &["aba"])?;
        check("(((abc)))", &["abc"], &["ab"])
    }

    #[test]
    fn test_complex_expression() -> Result<()> {
        check(
            "ab*(c|a)*cabba(bb|aa|cc)(ab)*",
            &["acacacabbaaa", "abbbbbbbcabbaccababab", "acabbacc"],
            &["acabba", "bcabbaaa"],
        )
    }

    #[test]
    fn test_plus() -> Result<()> {
        check("a+", &["a", "aa", "aaaaa"], &[""])
    }

    #[test]
    fn test_question_mark() -> Result<()> {
        check("a?", &["", "a"], &["aa", "b"])?;
        check("(abba)?", &["", "abba"], &["abbaabba", "ab"])
    }

    #[test]
    fn test_repetition_range() -> Result<()> {
        check("a[2,3]", &["aa", "aaa"], &["", "a", "aaaa"])?;
        check("a[2,]", &["aa", "aaaaaa"], &["a"])?;
        check("a[,2]", &["", "a", "aa"], &["aaa"])?;
        check("(ab)[2]", &["abab"], &["ab", "ababab"])
    }

    #[test]
    fn test_character_range() -> Result<()> {
        check("a-e+", &["abcde", "eeee"], &["", "f", "abcdef"])?;
        check("0-9[3]", &["123", "000"], &["12", "12a"])
    }

    #[test]
    fn test_wildcard() -> Result<()> {
        check(".", &["a", "Z", "~"], &["", "ab"])?;
        check(".*(cat).*", &["cat", "a cat sat", "concatenate"], &["dog", "ca t"])
    }

    #[test]
    fn test_escapes() -> Result<()> {
        check("/a", &["a"], &["/a", ""])?;
        check("/*", &["*"], &["", "**"])?;
        check("a/+", &["a+"], &["a", "aa"])?;
        check("/(a/)", &["(a)"], &["a"])?;
        check("/!a", &["!a"], &["a", ""])?;
        check("//", &["/"], &["//"])?;
        check("(/))+", &[")", ")))"], &[""])?;
        check("a/?b", &["a?b"], &["ab", "b"])
    }

    #[test]
    fn test_negation() -> Result<()> {
        let nfa = compile("!a")?;
        assert!(nfa.is_dfa());
        assert!(!nfa.uses_caching());
        check("!a", &["", "bb", "aa", "b"], &["a"])
    }

    #[test]
    fn test_negation_in_concat() -> Result<()> {
        check(
            "(a|cd*)!(a*)",
            &["aba", "cruntti", "cdb", "cdd"],
            &["aa", "aaa", "a", "c", "caa", ""],
        )
    }

    #[test]
    fn test_nested_negation() -> Result<()> {
        check("!(!(ab))", &["ab"], &["", "a", "abb"])?;
        check("!(!(ab))c", &["abc"], &["ab", "c", "abcc"])?;
        check("!!ab", &["ab"], &["a", "b"])
    }

    #[test]
    fn test_negation_binds_to_next_operand() -> Result<()> {
        check("!ab", &["bb", "b"], &["ab"])?;
        check("x!(ab)", &["x", "xa", "xabc"], &["xab", "ab"])
    }

    #[test]
    fn test_negation_reuses_table() -> Result<()> {
        let mut generator = NfaGenerator::new();
        let nfa = generator.generate("!(ab)c|!(ab)d")?;
        assert!(nfa.accepts("ac"));
        assert!(nfa.accepts("bd"));
        assert!(!nfa.accepts("abc"));
        assert!(!nfa.accepts("abd"));
        assert_eq!(generator.complements.cached_tables(), 1);
        Ok(())
    }

    #[test]
    fn test_caching_does_not_change_results() -> Result<()> {
        let inputs = ["", "a", "ab", "abab", "aab", "ba", "cdcd", "abcd"];
        for pattern in ["(ab)*", "a?b+", "(a|b)*c?", "!(ab)*", "(cd)[1,2]"] {
            let nfa = compile(pattern)?;
            let with_cache: Vec<bool> = inputs.iter().map(|s| nfa.accepts(s)).collect();
            let again: Vec<bool> = inputs.iter().map(|s| nfa.accepts(s)).collect();
            nfa.disable_caching();
            let without_cache: Vec<bool> = inputs.iter().map(|s| nfa.accepts(s)).collect();
            assert_eq!(with_cache, again, "{}", pattern);
            assert_eq!(with_cache, without_cache, "{}", pattern);
        }
        Ok(())
    }

    #[test]
    fn test_generator_cache() -> Result<()> {
        let mut generator = NfaGenerator::new();
        let first = generator.generate("a+b")?;
        let second = generator.generate("a+b")?;
        assert!(Rc::ptr_eq(&first, &second));
        // Same canonical form, same automaton.
        let third = generator.generate("(aa*)b")?;
        assert!(Rc::ptr_eq(&first, &third));
        assert_eq!(generator.cached_patterns(), 1);

        let mut uncached = NfaGenerator::with_config(Config::default().without_caching());
        let a = uncached.generate("a+b")?;
        let b = uncached.generate("a+b")?;
        assert!(!Rc::ptr_eq(&a, &b));
        assert!(!a.uses_caching());
        for input in ["ab", "aab", "b", ""] {
            assert_eq!(a.accepts(input), b.accepts(input));
            assert_eq!(a.accepts(input), first.accepts(input));
        }
        Ok(())
    }

    #[test]
    fn test_extra_symbols() -> Result<()> {
        let config = Config::default().with_alphabet(Alphabet::new().with_symbols([' ']));
        let nfa = NfaGenerator::with_config(config).generate("a b")?;
        assert!(nfa.accepts("a b"));
        assert!(!nfa.accepts("ab"));
        Ok(())
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert_eq!(
            compile("(ab").err(),
            Some(PatternError::UnbalancedParentheses { position: 0 })
        );
        assert_eq!(
            compile("ab)").err(),
            Some(PatternError::UnbalancedParentheses { position: 3 })
        );
    }

    #[test]
    fn test_missing_operands() {
        assert_eq!(
            compile("|a").err(),
            Some(PatternError::EmptyOperandStack {
                operator: '|',
                position: 0
            })
        );
        assert_eq!(
            compile("a|").err(),
            Some(PatternError::EmptyOperandStack {
                operator: '|',
                position: 1
            })
        );
        assert_eq!(
            compile("*a").err(),
            Some(PatternError::EmptyOperandStack {
                operator: '*',
                position: 0
            })
        );
        assert_eq!(
            compile("()").err(),
            Some(PatternError::EmptyOperandStack {
                operator: ')',
                position: 1
            })
        );
        assert!(matches!(
            compile("a(|b)").err(),
            Some(PatternError::EmptyOperandStack { operator: '|', .. })
        ));
        assert!(matches!(
            compile("!").err(),
            Some(PatternError::EmptyOperandStack { operator: '!', .. })
        ));
    }

    #[test]
    fn test_unsupported_symbol() {
        assert_eq!(
            compile("a b").err(),
            Some(PatternError::UnsupportedSymbol {
                symbol: ' ',
                position: 1
            })
        );
        assert!(matches!(
            compile("a]").err(),
            Some(PatternError::UnsupportedSymbol { symbol: ']', .. })
        ));
    }

    #[test]
    fn test_invalid_repetition() {
        assert!(matches!(
            compile("a[3,1]").err(),
            Some(PatternError::InvalidRepetitionRange { .. })
        ));
    }
}
