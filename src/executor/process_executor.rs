use std::io::{self, Write};
use nix::sys::signal::Signal;
use crate::ast::{Command, ExecutionPlan, RedirectKind};
use crate::context::ShellContext;
use crate::executor::builtins::{BuiltinIo, BuiltinManager};
use crate::executor::command::{ExecImage, PreparedCommand, Program};
use crate::executor::path_resolver::{PathResolver, Resolution};
use crate::executor::pipeline::{Outcome, RunningPipeline};
use crate::executor::redirect;
use crate::executor::{ExecError, ExecStatus, Executor, status};
use crate::io::{FdWriter, describe_error};
use crate::signal::{self, InterruptDeferral};

/// Runs plans as real processes connected by pipes.
pub struct ProcessExecutor {
    builtins: BuiltinManager,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessExecutor {
    pub fn new() -> Self {
        ProcessExecutor {
            builtins: BuiltinManager::new(),
        }
    }

    pub fn builtins(&self) -> &BuiltinManager {
        &self.builtins
    }

    fn in_shell_builtin<'p>(&self, plan: &'p ExecutionPlan) -> Option<&'p Command> {
        match plan.commands.as_slice() {
            [command] => command
                .name()
                .filter(|name| self.builtins.is_builtin(name))
                .map(|_| command),
            _ => None,
        }
    }

    fn run_in_shell(&self, command: &Command, ctx: &mut ShellContext) -> i32 {
        let name = command.name().unwrap_or_default();
        tracing::debug!(name, "running builtin in shell");
        let file = match redirect::shell_output(&command.redirections) {
            Ok(file) => file,
            Err((target, e)) => {
                eprintln!("minishell: {}: {}", target, describe_error(&e));
                return status::FAILURE;
            }
        };
        let mut out: Box<dyn Write> = match file {
            Some(file) => Box::new(file),
            None => Box::new(io::stdout()),
        };
        let mut err = io::stderr();
        self.builtins.execute(
            name,
            command.args(),
            ctx,
            &mut BuiltinIo {
                out: &mut out,
                err: &mut err,
            },
        )
    }

    fn prepare<'a>(
        &self,
        command: &'a Command,
        ctx: &ShellContext,
        envp: &[String],
    ) -> Result<PreparedCommand<'a>, ExecError> {
        let program = match command.name() {
            None => Program::Empty,
            Some(name) if self.builtins.is_builtin(name) => Program::Builtin,
            Some(name) => match PathResolver::new(ctx.search_path()).resolve(name) {
                Resolution::Found(path) => {
                    Program::External(ExecImage::new(&path, &command.argv, envp)?)
                }
                Resolution::NotExecutable(path) if path.is_dir() => {
                    unavailable(name, "Is a directory", status::NOT_EXECUTABLE)
                }
                Resolution::NotExecutable(_) => {
                    unavailable(name, "Permission denied", status::NOT_EXECUTABLE)
                }
                Resolution::NotFound if name.contains('/') => {
                    unavailable(name, "No such file or directory", status::NOT_FOUND)
                }
                Resolution::NotFound => unavailable(name, "command not found", status::NOT_FOUND),
            },
        };
        PreparedCommand::new(command, program)
    }

    // Body of a forked child. Never returns to the caller's loop: the
    // pipeline exits with the returned status. Built-ins do not exec and
    // may allocate; `scratch` is their copy of the context, cloned before
    // the fork.
    fn run_child(&self, prepared: &PreparedCommand<'_>, scratch: Option<ShellContext>) -> i32 {
        signal::reset_for_child();
        for redirect in &prepared.redirects {
            if redirect.apply().is_err() {
                return status::FAILURE;
            }
        }
        match &prepared.program {
            Program::Empty => status::SUCCESS,
            Program::Builtin => {
                let mut ctx = scratch.unwrap_or_default();
                let mut out = FdWriter::stdout();
                let mut err = FdWriter::stderr();
                self.builtins.execute(
                    prepared.command.name().unwrap_or_default(),
                    prepared.command.args(),
                    &mut ctx,
                    &mut BuiltinIo {
                        out: &mut out,
                        err: &mut err,
                    },
                )
            }
            Program::Unavailable { message, status } => {
                FdWriter::stderr().report(&[message.as_slice()]);
                *status
            }
            Program::External(image) => image.exec(),
        }
    }

    fn run_pipeline(&self, plan: &ExecutionPlan, ctx: &ShellContext) -> Result<Outcome, ExecError> {
        let envp = ctx.env.envp();
        let prepared = plan
            .commands
            .iter()
            .map(|command| self.prepare(command, ctx, &envp))
            .collect::<Result<Vec<_>, _>>()?;

        // Mutations made by a built-in stay in its child.
        let scratch: Vec<Option<ShellContext>> = prepared
            .iter()
            .map(|p| matches!(p.program, Program::Builtin).then(|| ctx.clone()))
            .collect();

        let mut pipeline = RunningPipeline::new(prepared.len());
        pipeline.allocate_pipes()?;
        let _deferral = InterruptDeferral::new();
        for (k, (command, scratch)) in prepared.iter().zip(scratch).enumerate() {
            pipeline.spawn(k, move || self.run_child(command, scratch))?;
        }
        Ok(pipeline.wait_all())
    }
}

fn unavailable(name: &str, reason: &str, status: i32) -> Program {
    Program::Unavailable {
        message: format!("minishell: {}: {}\n", name, reason).into_bytes(),
        status,
    }
}

/// What the shell prints when the last stage was killed by a terminal signal.
fn signal_message(outcome: &Outcome) -> Option<&'static str> {
    match outcome.signal {
        Some(Signal::SIGQUIT) if outcome.core_dumped => Some("Quit (core dumped)\n"),
        Some(Signal::SIGQUIT) => Some("Quit\n"),
        Some(Signal::SIGINT) => Some("\n"),
        _ => None,
    }
}

impl Executor for ProcessExecutor {
    fn execute(&mut self, plan: &ExecutionPlan, ctx: &mut ShellContext) -> ExecStatus {
        if plan.is_empty() {
            return Ok(ctx.last_status);
        }
        let heredoc = plan
            .commands
            .iter()
            .flat_map(|command| &command.redirections)
            .any(|r| r.kind == RedirectKind::Heredoc);
        if heredoc {
            return Err(ExecError::Unsupported("here-document".to_string()));
        }

        let status = match self.in_shell_builtin(plan) {
            Some(command) => self.run_in_shell(command, ctx),
            None => {
                let outcome = self.run_pipeline(plan, ctx)?;
                if let Some(message) = signal_message(&outcome) {
                    eprint!("{}", message);
                }
                outcome.status
            }
        };
        tracing::debug!(status, commands = plan.len(), "plan finished");
        ctx.last_status = status;
        Ok(status)
    }
}
