use thiserror::Error;
use crate::executor::ExecError;
use crate::executor::status;

/// Errors that abort the current input line before anything runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unterminated quote `{quote}' starting at position {pos}")]
    UnterminatedQuote { quote: char, pos: usize },
    #[error("syntax error near unexpected token `|'")]
    MisplacedPipe { pos: usize },
    #[error("syntax error near unexpected token `{found}'")]
    MissingRedirectTarget { operator: String, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("{0}: ambiguous redirect")]
    AmbiguousRedirect(String),
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl ShellError {
    /// Status recorded for a line that failed with this error, or `None`
    /// when the previous status must be kept.
    pub fn status(&self) -> Option<i32> {
        match self {
            ShellError::Syntax(_) => Some(status::SYNTAX_ERROR),
            ShellError::Expand(_) => Some(status::FAILURE),
            ShellError::Exec(ExecError::Unsupported(_)) => Some(status::SYNTAX_ERROR),
            ShellError::Exec(ExecError::InvalidArgument(_)) => Some(status::FAILURE),
            ShellError::Exec(_) => None,
        }
    }
}
