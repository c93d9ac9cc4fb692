pub mod ast;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod executor;
pub mod expander;
pub mod io;
pub mod lexer;
pub mod parser;
pub mod prompt;
pub mod repl;
pub mod signal;
