#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,           // command, argument or redirect target
    Pipe,           // |
    RedirectIn,     // <
    RedirectOut,    // >
    RedirectAppend, // >>
    HeredocMarker,  // <<
}

impl TokenKind {
    pub fn is_redirect(self) -> bool {
        matches!(
            self,
            TokenKind::RedirectIn
                | TokenKind::RedirectOut
                | TokenKind::RedirectAppend
                | TokenKind::HeredocMarker
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,        // Raw text; quotes are kept until expansion
    pub span: (usize, usize), // Byte offsets in the input line [start, end)
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, span: (usize, usize)) -> Self {
        Token {
            kind,
            value: value.into(),
            span,
        }
    }

    pub fn word(value: impl Into<String>, span: (usize, usize)) -> Self {
        Token::new(TokenKind::Word, value, span)
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}
