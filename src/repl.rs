use std::io::BufRead;
use crate::context::ShellContext;
use crate::error::ShellError;
use crate::executor::Executor;
use crate::io::describe_error;
use crate::prompt::ShellPrompt;
use crate::signal;
use crate::{expander, lexer, parser};

/// Status recorded when Ctrl-C abandons the line at the prompt.
const INTERRUPTED_STATUS: i32 = 130;

/// Drives one line at a time through tokenizing, expansion, planning and
/// execution.
pub struct Shell<E> {
    ctx: ShellContext,
    executor: E,
}

impl<E: Executor> Shell<E> {
    pub fn new(ctx: ShellContext, executor: E) -> Self {
        Shell { ctx, executor }
    }

    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ShellContext {
        &mut self.ctx
    }

    fn process(&mut self, line: &str) -> Result<i32, ShellError> {
        let tokens = lexer::tokenize(line)?;
        let tokens = expander::expand(tokens, &self.ctx)?;
        let plan = parser::build(&tokens)?;
        Ok(self.executor.execute(&plan, &mut self.ctx)?)
    }

    /// Runs one input line and returns the resulting status. Errors are
    /// reported on stderr and never end the shell.
    pub fn run_line(&mut self, line: &str) -> i32 {
        self.ctx.last_input = line.to_string();
        self.ctx.error = false;
        if let Err(e) = self.process(line) {
            eprintln!("minishell: {}", e);
            self.ctx.error = true;
            match e.status() {
                Some(status) => self.ctx.last_status = status,
                None => tracing::warn!(error = %e, "line aborted, status unchanged"),
            }
        }
        self.ctx.last_status
    }

    /// Reads and runs lines until end of input or `exit`.
    pub fn run<R: BufRead>(&mut self, prompt: &mut ShellPrompt<R>) -> i32 {
        while !self.ctx.should_exit {
            prompt.show_prompt();
            let line = match prompt.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    eprintln!("minishell: {}", describe_error(&e));
                    break;
                }
            };
            if prompt.is_interactive() && signal::take_interrupted() {
                self.ctx.last_status = INTERRUPTED_STATUS;
            }
            if line.trim().is_empty() {
                continue;
            }
            self.run_line(&line);
        }
        if prompt.is_interactive() {
            eprintln!("exit");
        }
        self.ctx.last_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::ast::ExecutionPlan;
    use crate::environment::Environment;
    use crate::executor::{ExecError, ExecStatus};

    #[derive(Default)]
    struct RecordingExecutor {
        plans: Vec<ExecutionPlan>,
        fail_with: Option<fn() -> ExecError>,
    }

    impl Executor for RecordingExecutor {
        fn execute(&mut self, plan: &ExecutionPlan, ctx: &mut ShellContext) -> ExecStatus {
            self.plans.push(plan.clone());
            if let Some(make_error) = self.fail_with {
                return Err(make_error());
            }
            // `exit` stops the loop; every other plan reports its length.
            if plan.commands.first().and_then(|c| c.name()) == Some("exit") {
                ctx.should_exit = true;
            }
            ctx.last_status = plan.len() as i32;
            Ok(ctx.last_status)
        }
    }

    fn shell() -> Shell<RecordingExecutor> {
        let env = Environment::from_exported([("USER", "alice"), ("LIST", "a  b")]);
        Shell::new(ShellContext::new(env), RecordingExecutor::default())
    }

    fn argv(shell: &Shell<RecordingExecutor>, index: usize) -> Vec<String> {
        shell.executor.plans[index].commands[0].argv.clone()
    }

    #[test]
    fn test_line_flows_through_every_stage() {
        let mut shell = shell();
        assert_eq!(shell.run_line("echo \"$USER\" $LIST | wc -l"), 2);
        assert_eq!(argv(&shell, 0), vec!["echo", "alice", "a", "b"]);
        assert_eq!(shell.context().last_input, "echo \"$USER\" $LIST | wc -l");
        assert!(!shell.context().error);
    }

    #[test]
    fn test_status_is_visible_to_next_line() {
        let mut shell = shell();
        shell.run_line("a | b | c");
        shell.run_line("echo $?");
        assert_eq!(argv(&shell, 1), vec!["echo", "3"]);
    }

    #[test]
    fn test_syntax_error_sets_status_two() {
        let mut shell = shell();
        assert_eq!(shell.run_line("ls |"), 2);
        assert!(shell.context().error);
        assert!(shell.executor.plans.is_empty());

        assert_eq!(shell.run_line("echo 'open"), 2);
        shell.run_line("true");
        assert!(!shell.context().error);
    }

    #[test]
    fn test_ambiguous_redirect_sets_status_one() {
        let mut shell = shell();
        assert_eq!(shell.run_line("echo > $LIST"), 1);
        assert!(shell.context().error);
        assert!(shell.executor.plans.is_empty());
    }

    #[test]
    fn test_system_error_keeps_status() {
        let mut shell = shell();
        shell.context_mut().last_status = 7;
        shell.executor.fail_with = Some(|| ExecError::system("fork")(nix::errno::Errno::EAGAIN));
        assert_eq!(shell.run_line("ls"), 7);
        assert!(shell.context().error);
    }

    #[test]
    fn test_unsupported_sets_status_two() {
        let mut shell = shell();
        shell.executor.fail_with = Some(|| ExecError::Unsupported("here-document".into()));
        assert_eq!(shell.run_line("cat << EOF"), 2);
    }

    #[test]
    fn test_run_until_exit() {
        let mut shell = shell();
        let input = Cursor::new("\necho one\n   \nexit\necho never\n");
        let mut prompt = ShellPrompt::new("$ ", false, input);
        assert_eq!(shell.run(&mut prompt), 1);
        assert_eq!(shell.executor.plans.len(), 2);
    }

    #[test]
    fn test_invalid_utf8_line_does_not_end_session() {
        let mut shell = shell();
        let input: &[u8] = b"echo \xff\nexit\n";
        let mut prompt = ShellPrompt::new("$ ", false, input);
        shell.run(&mut prompt);
        assert_eq!(shell.executor.plans.len(), 2);
        assert_eq!(argv(&shell, 0), vec!["echo", "\u{fffd}"]);
        assert!(shell.context().should_exit);
    }

    #[test]
    fn test_run_until_eof_returns_last_status() {
        let mut shell = shell();
        let mut prompt = ShellPrompt::new("$ ", false, Cursor::new("a | b"));
        assert_eq!(shell.run(&mut prompt), 2);
    }
}
