use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use crate::context::ShellContext;
use crate::environment::is_valid_name;
use crate::executor::status;
use crate::io::describe_error;

/// Streams a built-in writes to.
pub struct BuiltinIo<'a> {
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

impl BuiltinIo<'_> {
    fn error(&mut self, msg: std::fmt::Arguments<'_>) {
        let _ = writeln!(self.err, "minishell: {}", msg);
    }
}

pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    fn run(&self, args: &[String], ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32;
}

pub struct BuiltinManager {
    commands: HashMap<String, Box<dyn BuiltinCommand>>,
}

impl Default for BuiltinManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinManager {
    pub fn new() -> Self {
        let mut mgr = BuiltinManager {
            commands: HashMap::new(),
        };
        mgr.register(Box::new(HelpCommand {}));
        mgr.register(Box::new(CdCommand {}));
        mgr.register(Box::new(ExitCommand {}));
        mgr.register(Box::new(ExportCommand {}));
        mgr.register(Box::new(UnsetCommand {}));
        mgr.register(Box::new(EchoCommand {}));
        mgr.register(Box::new(PwdCommand {}));
        mgr.register(Box::new(EnvCommand {}));
        mgr
    }

    pub fn register(&mut self, cmd: Box<dyn BuiltinCommand>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Runs `name` with `args` (the command name excluded). Unknown names
    /// yield the not-found status.
    pub fn execute(
        &self,
        name: &str,
        args: &[String],
        ctx: &mut ShellContext,
        io: &mut BuiltinIo<'_>,
    ) -> i32 {
        match self.commands.get(name) {
            Some(cmd) => {
                let code = cmd.run(args, ctx, io);
                let _ = io.out.flush();
                code
            }
            None => {
                io.error(format_args!("{}: command not found", name));
                status::NOT_FOUND
            }
        }
    }
}

pub struct HelpCommand;

impl BuiltinCommand for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }
    fn run(&self, _args: &[String], _ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32 {
        let text = "Available built-in commands:\n\
                    \x20 cd [DIR|-]            : Change directory\n\
                    \x20 echo [-n] [ARG]...    : Print arguments\n\
                    \x20 env                   : Print exported variables\n\
                    \x20 exit [N]              : Exit shell\n\
                    \x20 export [NAME[=VALUE]] : Export variables\n\
                    \x20 help                  : Show this help\n\
                    \x20 pwd                   : Print working directory\n\
                    \x20 unset [NAME]...       : Remove variables\n";
        match io.out.write_all(text.as_bytes()) {
            Ok(()) => status::SUCCESS,
            Err(_) => status::FAILURE,
        }
    }
}

pub struct CdCommand;

impl BuiltinCommand for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }
    fn run(&self, args: &[String], ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32 {
        if args.len() > 1 {
            io.error(format_args!("cd: too many arguments"));
            return status::FAILURE;
        }
        let (target, print) = match args.first().map(|s| s.as_str()) {
            None => match ctx.env.get("HOME") {
                Some(home) => (home.to_string(), false),
                None => {
                    io.error(format_args!("cd: HOME not set"));
                    return status::FAILURE;
                }
            },
            Some("-") => match ctx.env.get("OLDPWD") {
                Some(old) => (old.to_string(), true),
                None => {
                    io.error(format_args!("cd: OLDPWD not set"));
                    return status::FAILURE;
                }
            },
            Some(dir) => (dir.to_string(), false),
        };

        let previous = std::env::current_dir()
            .ok()
            .map(|p| p.display().to_string())
            .or_else(|| ctx.env.get("PWD").map(str::to_string));
        if let Err(e) = std::env::set_current_dir(&target) {
            io.error(format_args!("cd: {}: {}", target, describe_error(&e)));
            return status::FAILURE;
        }
        let current = std::env::current_dir().unwrap_or_else(|_| PathBuf::from(&target));

        if let Some(previous) = previous {
            ctx.env.set_exported("OLDPWD", &previous);
        }
        ctx.env.set_exported("PWD", &current.display().to_string());
        if print && writeln!(io.out, "{}", current.display()).is_err() {
            return status::FAILURE;
        }
        status::SUCCESS
    }
}

pub struct ExitCommand;

impl BuiltinCommand for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }
    fn run(&self, args: &[String], ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32 {
        let Some(arg) = args.first() else {
            ctx.should_exit = true;
            return ctx.last_status;
        };
        match arg.trim().parse::<i64>() {
            Ok(_) if args.len() > 1 => {
                io.error(format_args!("exit: too many arguments"));
                status::FAILURE
            }
            Ok(code) => {
                ctx.should_exit = true;
                code.rem_euclid(256) as i32
            }
            Err(_) => {
                io.error(format_args!("exit: {}: numeric argument required", arg));
                ctx.should_exit = true;
                status::SYNTAX_ERROR
            }
        }
    }
}

/// Escapes the characters that stay special inside double quotes.
fn double_quote_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub struct ExportCommand;

impl BuiltinCommand for ExportCommand {
    fn name(&self) -> &'static str {
        "export"
    }
    fn run(&self, args: &[String], ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32 {
        if args.is_empty() {
            for (k, v) in ctx.env.exported_vars() {
                if writeln!(io.out, "declare -x {}=\"{}\"", k, double_quote_escape(&v)).is_err() {
                    return status::FAILURE;
                }
            }
            return status::SUCCESS;
        }

        let mut code = status::SUCCESS;
        for arg in args {
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (arg.as_str(), None),
            };
            if !is_valid_name(name) {
                io.error(format_args!("export: `{}': not a valid identifier", arg));
                code = status::FAILURE;
                continue;
            }
            match value {
                Some(value) => ctx.env.set_exported(name, value),
                None => ctx.env.export(name),
            }
        }
        code
    }
}

pub struct UnsetCommand;

impl BuiltinCommand for UnsetCommand {
    fn name(&self) -> &'static str {
        "unset"
    }
    fn run(&self, args: &[String], ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32 {
        let mut code = status::SUCCESS;
        for name in args {
            if is_valid_name(name) {
                ctx.env.unset(name);
            } else {
                io.error(format_args!("unset: `{}': not a valid identifier", name));
                code = status::FAILURE;
            }
        }
        code
    }
}

pub struct EchoCommand;

impl BuiltinCommand for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }
    fn run(&self, args: &[String], _ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32 {
        // Any run of leading -n, -nn, ... options suppresses the newline.
        let is_n_flag = |a: &String| a.len() > 1 && a.starts_with('-') && a[1..].chars().all(|c| c == 'n');
        let flags = args.iter().take_while(|a| is_n_flag(a)).count();
        let mut line = args[flags..].join(" ");
        if flags == 0 {
            line.push('\n');
        }
        match io.out.write_all(line.as_bytes()) {
            Ok(()) => status::SUCCESS,
            Err(_) => status::FAILURE,
        }
    }
}

pub struct PwdCommand;

impl BuiltinCommand for PwdCommand {
    fn name(&self) -> &'static str {
        "pwd"
    }
    fn run(&self, _args: &[String], ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32 {
        let dir = match std::env::current_dir() {
            Ok(dir) => dir.display().to_string(),
            Err(e) => match ctx.env.get("PWD") {
                Some(pwd) => pwd.to_string(),
                None => {
                    io.error(format_args!("pwd: {}", describe_error(&e)));
                    return status::FAILURE;
                }
            },
        };
        match writeln!(io.out, "{}", dir) {
            Ok(()) => status::SUCCESS,
            Err(_) => status::FAILURE,
        }
    }
}

pub struct EnvCommand;

impl BuiltinCommand for EnvCommand {
    fn name(&self) -> &'static str {
        "env"
    }
    fn run(&self, args: &[String], ctx: &mut ShellContext, io: &mut BuiltinIo<'_>) -> i32 {
        if let Some(arg) = args.first() {
            io.error(format_args!("env: {}: arguments are not supported", arg));
            return status::NOT_FOUND;
        }
        for entry in ctx.env.envp() {
            if writeln!(io.out, "{}", entry).is_err() {
                return status::FAILURE;
            }
        }
        status::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    fn run(name: &str, args: &[&str], ctx: &mut ShellContext) -> (i32, String, String) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = BuiltinManager::new().execute(
            name,
            &args,
            ctx,
            &mut BuiltinIo {
                out: &mut out,
                err: &mut err,
            },
        );
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    fn ctx() -> ShellContext {
        ShellContext::new(Environment::empty())
    }

    #[test]
    fn test_registered_builtins() {
        let mgr = BuiltinManager::new();
        for name in ["cd", "echo", "env", "exit", "export", "help", "pwd", "unset"] {
            assert!(mgr.is_builtin(name), "{} should be a builtin", name);
        }
        assert!(!mgr.is_builtin("ls"));
    }

    #[test]
    fn test_echo() {
        let mut ctx = ctx();
        assert_eq!(run("echo", &["a", "b"], &mut ctx).1, "a b\n");
        assert_eq!(run("echo", &["-n", "-nnn", "a"], &mut ctx).1, "a");
        assert_eq!(run("echo", &["-n-", "a"], &mut ctx).1, "-n- a\n");
        assert_eq!(run("echo", &[], &mut ctx).1, "\n");
    }

    #[test]
    fn test_export_sets_and_lists() {
        let mut ctx = ctx();
        let (code, _, _) = run("export", &["B=2", "A=x=y"], &mut ctx);
        assert_eq!(code, 0);
        assert_eq!(ctx.env.get("A"), Some("x=y"));
        assert!(ctx.env.is_exported("B"));
        let (_, out, _) = run("export", &[], &mut ctx);
        assert_eq!(out, "declare -x A=\"x=y\"\ndeclare -x B=\"2\"\n");
    }

    #[test]
    fn test_export_listing_escapes_values() {
        let mut ctx = ctx();
        ctx.env.set_exported("Q", r#"say "hi" $HOME \ `id`"#);
        let (_, out, _) = run("export", &[], &mut ctx);
        assert_eq!(out, "declare -x Q=\"say \\\"hi\\\" \\$HOME \\\\ \\`id\\`\"\n");
    }

    #[test]
    fn test_export_marks_existing_variable() {
        let mut ctx = ctx();
        ctx.env.set("LOCAL", "1");
        run("export", &["LOCAL"], &mut ctx);
        assert!(ctx.env.is_exported("LOCAL"));
    }

    #[test]
    fn test_export_invalid_identifier() {
        let mut ctx = ctx();
        let (code, _, err) = run("export", &["1A=b", "OK=1"], &mut ctx);
        assert_eq!(code, 1);
        assert!(err.contains("not a valid identifier"));
        assert_eq!(ctx.env.get("OK"), Some("1"));
    }

    #[test]
    fn test_unset() {
        let mut ctx = ctx();
        ctx.env.set_exported("A", "1");
        assert_eq!(run("unset", &["A", "NEVER_SET"], &mut ctx).0, 0);
        assert_eq!(ctx.env.get("A"), None);
        assert_eq!(run("unset", &["A-B"], &mut ctx).0, 1);
    }

    #[test]
    fn test_env_lists_exported_only() {
        let mut ctx = ctx();
        ctx.env.set_exported("A", "1");
        ctx.env.set("B", "2");
        assert_eq!(run("env", &[], &mut ctx).1, "A=1\n");
    }

    #[test]
    fn test_exit() {
        let mut ctx = ctx();
        ctx.last_status = 5;
        assert_eq!(run("exit", &[], &mut ctx).0, 5);
        assert!(ctx.should_exit);

        let mut ctx = self::ctx();
        assert_eq!(run("exit", &["258"], &mut ctx).0, 2);
        assert_eq!(run("exit", &["-1"], &mut ctx).0, 255);

        let mut ctx = self::ctx();
        let (code, _, err) = run("exit", &["1", "2"], &mut ctx);
        assert_eq!(code, 1);
        assert!(!ctx.should_exit);
        assert!(err.contains("too many arguments"));

        let (code, _, err) = run("exit", &["abc"], &mut ctx);
        assert_eq!(code, 2);
        assert!(ctx.should_exit);
        assert!(err.contains("numeric argument required"));
    }

    #[test]
    fn test_cd_without_home() {
        let mut ctx = ctx();
        let (code, _, err) = run("cd", &[], &mut ctx);
        assert_eq!(code, 1);
        assert_eq!(err, "minishell: cd: HOME not set\n");
    }

    #[test]
    fn test_cd_to_missing_directory() {
        let mut ctx = ctx();
        let (code, _, err) = run("cd", &["/definitely/not/here"], &mut ctx);
        assert_eq!(code, 1);
        assert!(err.starts_with("minishell: cd: /definitely/not/here: "));
        assert_eq!(ctx.env.get("PWD"), None);
    }

    #[test]
    fn test_unknown_builtin() {
        let mut ctx = ctx();
        assert_eq!(run("nope", &[], &mut ctx).0, 127);
    }
}
