use crate::alphabet::{Alphabet, EPSILON, ESCAPE, WILDCARD};
use crate::error::{PatternError, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token {
    Symbol(char),
    Wildcard, // '.'
    Epsilon,  // '#'
    Operator(Operator),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    Open,   // '('
    Close,  // ')'
    Union,  // '|'
    Concat, // '&'
    Star,   // '*'
    Not,    // '!'
}

impl Operator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '(' => Some(Self::Open),
            ')' => Some(Self::Close),
            '|' => Some(Self::Union),
            '&' => Some(Self::Concat),
            '*' => Some(Self::Star),
            '!' => Some(Self::Not),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Open => '(',
            Self::Close => ')',
            Self::Union => '|',
            Self::Concat => '&',
            Self::Star => '*',
            Self::Not => '!',
        }
    }

    /// Whether a pending `self` on the operator stack must be evaluated before
    /// `next` is pushed. The arms are checked in order.
    pub fn has_precedence_over(self, next: Operator) -> bool {
        match (self, next) {
            (Self::Star, next) if next != Self::Star => true,
            (Self::Concat, Self::Union) => true,
            (_, Self::Open) => false,
            (Self::Close, _) => true,
            (Self::Not, _) => true,
            _ => false,
        }
    }
}

/// Splits a canonical pattern into tokens tagged with their character
/// position. `/x` becomes the literal `x`.
pub fn tokenize(canonical: &str, alphabet: &Alphabet) -> Result<Vec<(usize, Token)>> {
    let mut tokens = Vec::with_capacity(canonical.len());
    let mut chars = canonical.chars().enumerate();
    while let Some((position, c)) = chars.next() {
        let token = match c {
            ESCAPE => match chars.next() {
                Some((_, escaped)) if alphabet.is_operating(escaped) => Token::Symbol(escaped),
                Some((position, symbol)) => {
                    return Err(PatternError::UnsupportedSymbol { symbol, position })
                }
                None => return Err(PatternError::DanglingEscape { position }),
            },
            WILDCARD => Token::Wildcard,
            EPSILON => Token::Epsilon,
            c if alphabet.contains(c) => Token::Symbol(c),
            c => match Operator::from_char(c) {
                Some(operator) => Token::Operator(operator),
                None => {
                    return Err(PatternError::UnsupportedSymbol {
                        symbol: c,
                        position,
                    })
                }
            },
        };
        tokens.push((position, token));
    }
    Ok(tokens)
}
