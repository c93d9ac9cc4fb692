use std::iter::Peekable;
use std::str::CharIndices;
use super::token::{Token, TokenKind};
use super::QuoteState;
use crate::error::SyntaxError;

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n')
}

fn is_operator(ch: char) -> bool {
    matches!(ch, '|' | '<' | '>')
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        while self.chars.next_if(|&(_, ch)| is_blank(ch)).is_some() {}

        let Some(&(start, ch)) = self.chars.peek() else {
            return Ok(None);
        };
        let token = match ch {
            '|' => {
                self.chars.next();
                Token::new(TokenKind::Pipe, "|", (start, start + 1))
            }
            '<' | '>' => self.redirect(start, ch),
            _ => self.word(start)?,
        };
        Ok(Some(token))
    }

    // Two-character operators win over their one-character prefix.
    fn redirect(&mut self, start: usize, ch: char) -> Token {
        self.chars.next();
        let doubled = self.chars.next_if(|&(_, next)| next == ch).is_some();
        let (kind, text) = match (ch, doubled) {
            ('<', false) => (TokenKind::RedirectIn, "<"),
            ('<', true) => (TokenKind::HeredocMarker, "<<"),
            (_, false) => (TokenKind::RedirectOut, ">"),
            (_, true) => (TokenKind::RedirectAppend, ">>"),
        };
        Token::new(kind, text, (start, start + text.len()))
    }

    fn word(&mut self, start: usize) -> Result<Token, SyntaxError> {
        let mut quote = QuoteState::Unquoted;
        let mut quote_start = start;
        let mut end = start;

        while let Some(&(pos, ch)) = self.chars.peek() {
            if quote == QuoteState::Unquoted && (is_blank(ch) || is_operator(ch)) {
                break;
            }
            if let Some(next) = quote.transition(ch) {
                if next != QuoteState::Unquoted {
                    quote_start = pos;
                }
                quote = next;
            }
            self.chars.next();
            end = pos + ch.len_utf8();
        }

        if let Some(delimiter) = quote.delimiter() {
            return Err(SyntaxError::UnterminatedQuote {
                quote: delimiter,
                pos: quote_start,
            });
        }
        Ok(Token::word(&self.input[start..end], (start, end)))
    }
}
