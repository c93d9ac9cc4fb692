use crate::lexer::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    In,
    Out,
    Append,
    Heredoc,
}

impl RedirectKind {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::RedirectIn => Some(RedirectKind::In),
            TokenKind::RedirectOut => Some(RedirectKind::Out),
            TokenKind::RedirectAppend => Some(RedirectKind::Append),
            TokenKind::HeredocMarker => Some(RedirectKind::Heredoc),
            TokenKind::Word | TokenKind::Pipe => None,
        }
    }

    /// Standard stream the redirection replaces.
    pub fn target_fd(self) -> i32 {
        match self {
            RedirectKind::In | RedirectKind::Heredoc => 0,
            RedirectKind::Out | RedirectKind::Append => 1,
        }
    }

    pub fn operator(self) -> &'static str {
        match self {
            RedirectKind::In => "<",
            RedirectKind::Out => ">",
            RedirectKind::Append => ">>",
            RedirectKind::Heredoc => "<<",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub argv: Vec<String>,
    pub redirections: Vec<Redirection>, // encounter order
}

impl Command {
    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(|s| s.as_str())
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionPlan {
    pub commands: Vec<Command>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
