use crate::ast::{Command, ExecutionPlan, RedirectKind, Redirection};
use crate::error::SyntaxError;
use crate::lexer::{Token, TokenKind};
use crate::parser::Parser;

pub struct PipelineBuilder<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect_target(&mut self, kind: RedirectKind) -> Result<String, SyntaxError> {
        match self.next() {
            Some(tok) if tok.is_word() => Ok(tok.value.clone()),
            found => Err(SyntaxError::MissingRedirectTarget {
                operator: kind.operator().to_string(),
                found: found.map_or_else(|| "newline".to_string(), |t| t.value.clone()),
            }),
        }
    }

    // One command group: everything up to the next PIPE or the end.
    fn parse_command(&mut self) -> Result<Command, SyntaxError> {
        let mut command = Command::default();
        while let Some(tok) = self.peek() {
            if let Some(kind) = RedirectKind::from_token(tok.kind) {
                self.pos += 1;
                let target = self.expect_target(kind)?;
                command.redirections.push(Redirection { kind, target });
            } else if tok.is_word() {
                self.pos += 1;
                command.argv.push(tok.value.clone());
            } else {
                break;
            }
        }
        Ok(command)
    }
}

impl<'a> Parser for PipelineBuilder<'a> {
    fn parse(&mut self) -> Result<ExecutionPlan, SyntaxError> {
        let mut plan = ExecutionPlan::default();
        if self.tokens.is_empty() {
            return Ok(plan);
        }
        loop {
            let command = self.parse_command()?;
            let Some(tok) = self.next() else {
                plan.commands.push(command);
                break;
            };
            debug_assert_eq!(tok.kind, TokenKind::Pipe);
            // Leading pipe or two pipes in a row
            if command.argv.is_empty() && command.redirections.is_empty() {
                return Err(SyntaxError::MisplacedPipe { pos: tok.span.0 });
            }
            plan.commands.push(command);
            if self.peek().is_none() {
                return Err(SyntaxError::MisplacedPipe { pos: tok.span.0 });
            }
        }
        tracing::debug!(commands = plan.len(), "built execution plan");
        Ok(plan)
    }
}
