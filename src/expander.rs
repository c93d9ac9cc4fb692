//! Variable substitution, quote removal and field splitting of WORD tokens.
//!
//! A word is scanned with the quoting context recovered from its raw text:
//! single-quoted spans are copied verbatim, `$NAME` and `$?` are substituted
//! everywhere else. Values substituted outside quotes are split at blanks and
//! may produce zero, one or several fields; values substituted inside double
//! quotes always stay part of the current field.

use crate::context::ShellContext;
use crate::error::ExpandError;
use crate::lexer::{QuoteState, Token, TokenKind};

fn is_field_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n')
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Working state for a single word.
#[derive(Debug, Default)]
struct ExpansionState {
    buffer: String,
    cursor: usize,
    quote: QuoteState,
    var_start: usize,
    var_end: usize,
    did_expand: bool,
    // The buffer is a field even when empty (e.g. after `""`).
    in_field: bool,
    fields: Vec<String>,
}

impl ExpansionState {
    fn run(mut self, word: &[char], ctx: &ShellContext, substitute: bool) -> Self {
        while let Some(&ch) = word.get(self.cursor) {
            if let Some(next) = self.quote.transition(ch) {
                self.quote = next;
                self.in_field = true;
                self.cursor += 1;
                continue;
            }
            if ch == '$' && substitute && self.quote != QuoteState::Single {
                if let Some(value) = self.scan_reference(word, ctx) {
                    self.splice(&value);
                    continue;
                }
            }
            self.buffer.push(ch);
            self.in_field = true;
            self.cursor += 1;
        }
        if self.in_field {
            self.fields.push(std::mem::take(&mut self.buffer));
        }
        self
    }

    /// Resolves the reference starting at the `$` under the cursor. Returns
    /// `None`, leaving the cursor alone, when the `$` is literal.
    fn scan_reference(&mut self, word: &[char], ctx: &ShellContext) -> Option<String> {
        let start = self.cursor + 1;
        let value = match word.get(start) {
            Some('?') => {
                self.var_end = start + 1;
                ctx.last_status.to_string()
            }
            Some(&c) if is_name_start(c) => {
                let len = word[start..].iter().take_while(|&&c| is_name_char(c)).count();
                self.var_end = start + len;
                let name: String = word[start..self.var_end].iter().collect();
                ctx.env.get(&name).unwrap_or_default().to_string()
            }
            _ => return None,
        };
        self.var_start = start;
        self.cursor = self.var_end;
        tracing::trace!(start = self.var_start, end = self.var_end, "resolved reference");
        Some(value)
    }

    fn splice(&mut self, value: &str) {
        self.did_expand = true;
        if self.quote != QuoteState::Unquoted {
            self.buffer.push_str(value);
            self.in_field = true;
            return;
        }
        for ch in value.chars() {
            if is_field_separator(ch) {
                if self.in_field {
                    self.fields.push(std::mem::take(&mut self.buffer));
                    self.in_field = false;
                }
            } else {
                self.buffer.push(ch);
                self.in_field = true;
            }
        }
    }
}

/// Fields produced by one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub fields: Vec<String>,
    pub did_expand: bool,
}

/// Expands a single raw word.
pub fn expand_word(word: &str, ctx: &ShellContext) -> Expansion {
    expand_raw(word, ctx, true)
}

/// Removes quotes without substituting anything.
pub fn remove_quotes(word: &str) -> String {
    expand_raw(word, &ShellContext::default(), false)
        .fields
        .concat()
}

fn expand_raw(word: &str, ctx: &ShellContext, substitute: bool) -> Expansion {
    let chars: Vec<char> = word.chars().collect();
    let state = ExpansionState::default().run(&chars, ctx, substitute);
    Expansion {
        fields: state.fields,
        did_expand: state.did_expand,
    }
}

/// Expands every WORD token. Operators pass through unchanged and the
/// relative order of all tokens is preserved.
pub fn expand(tokens: Vec<Token>, ctx: &ShellContext) -> Result<Vec<Token>, ExpandError> {
    let mut expanded = Vec::with_capacity(tokens.len());
    let mut previous: Option<TokenKind> = None;

    for token in tokens {
        let kind = token.kind;
        match (kind, previous) {
            (TokenKind::Word, Some(TokenKind::HeredocMarker)) => {
                let delimiter = remove_quotes(&token.value);
                expanded.push(Token::word(delimiter, token.span));
            }
            (TokenKind::Word, Some(op)) if op.is_redirect() => {
                let expansion = expand_word(&token.value, ctx);
                let mut fields = expansion.fields;
                if fields.len() != 1 {
                    return Err(ExpandError::AmbiguousRedirect(token.value));
                }
                expanded.push(Token::word(fields.remove(0), token.span));
            }
            (TokenKind::Word, _) => {
                let expansion = expand_word(&token.value, ctx);
                if expansion.did_expand {
                    tracing::trace!(word = %token.value, fields = ?expansion.fields, "expanded word");
                }
                expanded.extend(
                    expansion
                        .fields
                        .into_iter()
                        .map(|field| Token::word(field, token.span)),
                );
            }
            _ => expanded.push(token),
        }
        previous = Some(kind);
    }
    Ok(expanded)
}
