mod executor;
mod command;
mod redirect;
pub mod builtins;
pub mod path_resolver;
pub mod pipeline;
mod process_executor;

pub use executor::{Executor, ExecError, ExecStatus, status};
pub use process_executor::ProcessExecutor;
