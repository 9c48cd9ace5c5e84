use thiserror::Error;

/// Reasons a pattern can fail to compile. Positions are character indices
/// into the text being processed when the problem was found.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum PatternError {
    #[error("Unbalanced parentheses at position {position}")]
    UnbalancedParentheses { position: usize },

    #[error("Invalid repetition range '[{range}]' at position {position}")]
    InvalidRepetitionRange { position: usize, range: String },

    #[error("Invalid character range '{start}-{end}' at position {position}")]
    InvalidCharacterRange {
        position: usize,
        start: String,
        end: String,
    },

    #[error("Operator '{operator}' at position {position} is missing an operand")]
    EmptyOperandStack { operator: char, position: usize },

    #[error("Unsupported symbol '{symbol}' at position {position}")]
    UnsupportedSymbol { symbol: char, position: usize },

    #[error("Unexpected end of pattern after escape at position {position}")]
    DanglingEscape { position: usize },

    #[error("Operand at position {position} is not joined by any operator")]
    MissingOperator { position: usize },
}

pub type Result<T> = core::result::Result<T, PatternError>;
