mod lexer;
mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind};

use crate::error::SyntaxError;

/// Quoting context of a character while scanning a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteState {
    #[default]
    Unquoted,
    Single,
    Double,
}

impl QuoteState {
    /// Returns the new state if `ch` opens or closes a quoted span in this state.
    pub fn transition(self, ch: char) -> Option<QuoteState> {
        match (self, ch) {
            (QuoteState::Unquoted, '\'') => Some(QuoteState::Single),
            (QuoteState::Unquoted, '"') => Some(QuoteState::Double),
            (QuoteState::Single, '\'') | (QuoteState::Double, '"') => Some(QuoteState::Unquoted),
            _ => None,
        }
    }

    pub fn delimiter(self) -> Option<char> {
        match self {
            QuoteState::Unquoted => None,
            QuoteState::Single => Some('\''),
            QuoteState::Double => Some('"'),
        }
    }
}

/// Splits one input line into tokens.
pub fn tokenize(line: &str) -> Result<Vec<Token>, SyntaxError> {
    let tokens = Lexer::new(line).tokenize_all()?;
    tracing::trace!(count = tokens.len(), "tokenized line");
    Ok(tokens)
}
