use nix::errno::Errno;
use thiserror::Error;
use crate::ast::ExecutionPlan;
use crate::context::ShellContext;

/// Exit statuses with a fixed meaning.
pub mod status {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const SYNTAX_ERROR: i32 = 2;
    pub const NOT_EXECUTABLE: i32 = 126;
    pub const NOT_FOUND: i32 = 127;
    pub const SIGNAL_BASE: i32 = 128;
}

pub type ExecStatus = Result<i32, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// A system call the shell itself depends on failed (fork, pipe).
    #[error("{op}: {source}")]
    System {
        op: &'static str,
        #[source]
        source: Errno,
    },
    #[error("{0}: not supported")]
    Unsupported(String),
    #[error("{0}: invalid argument")]
    InvalidArgument(String),
}

impl ExecError {
    pub fn system(op: &'static str) -> impl FnOnce(Errno) -> ExecError {
        move |source| ExecError::System { op, source }
    }
}

pub trait Executor {
    /// Runs the plan and records its final status in `ctx.last_status`.
    fn execute(&mut self, plan: &ExecutionPlan, ctx: &mut ShellContext) -> ExecStatus;
}
