use std::collections::HashMap;
use std::ops::Range;

use log::{debug, trace};

use crate::alphabet::{Alphabet, EPSILON, ESCAPE};
use crate::error::{PatternError, Result};

/// Rewrites human-written patterns into the canonical operator set
/// (`literal . # ( ) | & * !` and `/x` escapes) the generator consumes.
pub struct PatternProcessor {
    alphabet: Alphabet,
    cache: HashMap<String, String>,
    cache_enabled: bool,
}

impl PatternProcessor {
    pub fn new(alphabet: Alphabet) -> Self {
        Self {
            alphabet,
            cache: HashMap::new(),
            cache_enabled: true,
        }
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Full normalization: shorthand expansion, double negation removal and
    /// explicit concatenation. The empty pattern becomes `#`.
    pub fn elongate(&mut self, pattern: &str) -> Result<String> {
        if pattern.is_empty() {
            return Ok(EPSILON.to_string());
        }
        if self.cache_enabled {
            if let Some(hit) = self.cache.get(pattern) {
                trace!("Normalization cache hit for '{}'", pattern);
                return Ok(hit.clone());
            }
        }

        self.validate(pattern)?;
        let expanded = self.replace_shorthands(pattern)?;
        let collapsed = remove_unnecessary_negations(&expanded);
        let result = add_concatenation_symbols(&collapsed);
        debug!("Normalized '{}' into '{}'", pattern, result);

        if self.cache_enabled {
            self.cache.insert(pattern.to_string(), result.clone());
        }
        Ok(result)
    }

    fn validate(&self, pattern: &str) -> Result<()> {
        let mut chars = pattern.chars().enumerate();
        while let Some((position, c)) = chars.next() {
            if c == ESCAPE {
                match chars.next() {
                    Some((_, escaped)) if self.alphabet.is_operating(escaped) => {}
                    Some((position, symbol)) => {
                        return Err(PatternError::UnsupportedSymbol { symbol, position })
                    }
                    None => return Err(PatternError::DanglingEscape { position }),
                }
            } else if !self.alphabet.is_operating(c) {
                return Err(PatternError::UnsupportedSymbol {
                    symbol: c,
                    position,
                });
            }
        }
        Ok(())
    }

    /// Replaces `+`, `?`, `a-b` and `[m,n]` with equivalent basic operations.
    ///
    /// The scan resumes right after every inserted expansion, so an escape that
    /// follows an expansion is still read as an escape.
    pub fn replace_shorthands(&self, pattern: &str) -> Result<String> {
        let mut chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            i = match chars[i] {
                ESCAPE => i + 2,
                '+' => {
                    let start = operand_start(&chars, i, '+')?;
                    let operand = chars[start..i].to_vec();
                    let mut expansion = vec!['('];
                    expansion.extend(&operand);
                    expansion.extend(&operand);
                    expansion.extend(['*', ')']);
                    splice(&mut chars, start..i + 1, expansion)
                }
                '?' => {
                    let start = operand_start(&chars, i, '?')?;
                    let mut expansion = vec!['('];
                    expansion.extend(&chars[start..i]);
                    expansion.extend(['|', EPSILON, ')']);
                    splice(&mut chars, start..i + 1, expansion)
                }
                '-' => self.expand_range(&mut chars, i)?,
                '[' => expand_repetition(&mut chars, i)?,
                _ => i + 1,
            };
        }
        Ok(chars.into_iter().collect())
    }

    fn expand_range(&self, chars: &mut Vec<char>, index: usize) -> Result<usize> {
        let start = operand_start(chars, index, '-')?;
        let invalid = |chars: &[char]| PatternError::InvalidCharacterRange {
            position: index,
            start: chars[start..index].iter().collect(),
            end: chars.get(index + 1).map(|c| c.to_string()).unwrap_or_default(),
        };

        let low = match chars[start..index] {
            [c] if self.alphabet.contains(c) => c,
            [ESCAPE, c] => c,
            _ => return Err(invalid(&chars[..])),
        };
        let (high, end) = match chars[index + 1..] {
            [ESCAPE, c, ..] => (c, index + 3),
            [c, ..] if self.alphabet.contains(c) => (c, index + 2),
            _ => return Err(invalid(&chars[..])),
        };
        if low > high {
            return Err(invalid(&chars[..]));
        }

        // Highest first; the order does not change the language.
        let mut expansion = vec!['('];
        for c in (low..=high).rev().filter(|c| self.alphabet.is_operating(*c)) {
            if expansion.len() > 1 {
                expansion.push('|');
            }
            if Alphabet::is_reserved(c) {
                expansion.push(ESCAPE);
            }
            expansion.push(c);
        }
        expansion.push(')');
        Ok(splice(chars, start..end, expansion))
    }
}

fn expand_repetition(chars: &mut Vec<char>, index: usize) -> Result<usize> {
    let view: &[char] = chars.as_slice();
    let start = operand_start(view, index, '[')?;
    let close = (index + 1..view.len())
        .find(|&j| view[j] == ']' && !is_escaped(view, j))
        .ok_or_else(|| PatternError::InvalidRepetitionRange {
            position: index,
            range: view[index + 1..].iter().collect(),
        })?;
    let range: String = view[index + 1..close].iter().collect();
    let (min, max) = parse_bounds(&range).ok_or_else(|| PatternError::InvalidRepetitionRange {
        position: index,
        range: range.clone(),
    })?;

    let operand = view[start..index].to_vec();
    let mut expansion = vec!['('];
    match max {
        None => {
            for _ in 0..=min {
                expansion.extend(&operand);
            }
            expansion.push('*');
        }
        Some(max) => {
            for len in (min..=max).rev() {
                if len < max {
                    expansion.push('|');
                }
                if len == 0 {
                    expansion.push(EPSILON);
                }
                for _ in 0..len {
                    expansion.extend(&operand);
                }
            }
        }
    }
    expansion.push(')');
    Ok(splice(chars, start..close + 1, expansion))
}

/// `"m,n"`, `"m,"`, `",n"`, `","` or `"n"`. A missing upper bound is `None`.
fn parse_bounds(range: &str) -> Option<(usize, Option<usize>)> {
    let parts: Vec<&str> = range.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [exact] => {
            let n = exact.parse().ok()?;
            Some((n, Some(n)))
        }
        [min, max] => {
            let min = if min.is_empty() { 0 } else { min.parse().ok()? };
            let max = if max.is_empty() {
                None
            } else {
                Some(max.parse().ok()?)
            };
            match max {
                Some(max) if max < min => None,
                _ => Some((min, max)),
            }
        }
        _ => None,
    }
}

fn splice(chars: &mut Vec<char>, range: Range<usize>, replacement: Vec<char>) -> usize {
    let end = range.start + replacement.len();
    chars.splice(range, replacement);
    end
}

/// A character is escaped when an odd run of escape markers precedes it.
fn is_escaped(chars: &[char], index: usize) -> bool {
    chars[..index]
        .iter()
        .rev()
        .take_while(|c| **c == ESCAPE)
        .count()
        % 2
        == 1
}

/// Start index of the operand a shorthand at `index` applies to: a whole
/// parenthesized group, an escaped pair, or a single symbol, together with
/// any stars already applied to it.
fn operand_start(chars: &[char], index: usize, shorthand: char) -> Result<usize> {
    let missing = PatternError::EmptyOperandStack {
        operator: shorthand,
        position: index,
    };
    let last = index.checked_sub(1).ok_or_else(|| missing.clone())?;
    if is_escaped(chars, last) {
        return Ok(last - 1);
    }
    match chars[last] {
        ')' => matching_open(chars, last),
        '*' => operand_start(chars, last, shorthand).map_err(|_| missing),
        '(' | '|' | '&' | '!' => Err(missing),
        _ => Ok(last),
    }
}

fn matching_open(chars: &[char], close: usize) -> Result<usize> {
    let mut depth = 0usize;
    for j in (0..=close).rev() {
        if is_escaped(chars, j) {
            continue;
        }
        match chars[j] {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(j);
                }
            }
            _ => {}
        }
    }
    Err(PatternError::UnbalancedParentheses { position: close })
}

/// Drops every adjacent `!!` pair. Escaped characters are copied untouched.
pub fn remove_unnecessary_negations(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            ESCAPE => {
                result.extend(&chars[i..(i + 2).min(chars.len())]);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'!') => i += 2,
            c => {
                result.push(c);
                i += 1;
            }
        }
    }
    result
}

/// Inserts `&` wherever concatenation is implied. An escaped pair counts as a
/// single operand.
pub fn add_concatenation_symbols(pattern: &str) -> String {
    let mut result = String::with_capacity(pattern.len() * 2);
    let mut previous_ends_operand = false;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let (begins_operand, ends_operand) = match c {
            '(' | '!' => (true, false),
            '*' | ')' => (false, true),
            '|' | '&' => (false, false),
            _ => (true, true),
        };
        if previous_ends_operand && begins_operand {
            result.push('&');
        }
        result.push(c);
        if c == ESCAPE {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        }
        previous_ends_operand = ends_operand;
    }
    result
}
