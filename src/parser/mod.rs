pub mod builder;

use crate::ast::ExecutionPlan;
use crate::error::SyntaxError;
use crate::lexer::Token;
use builder::PipelineBuilder;

pub trait Parser {
    fn parse(&mut self) -> Result<ExecutionPlan, SyntaxError>;
}

/// Builds the execution plan for an expanded token sequence.
pub fn build(tokens: &[Token]) -> Result<ExecutionPlan, SyntaxError> {
    PipelineBuilder::new(tokens).parse()
}
