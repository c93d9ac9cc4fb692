use std::path::PathBuf;
use argh::FromArgs;
use tracing_subscriber::EnvFilter;
use minishell_rs::config::{Config, ConfigLoader};
use minishell_rs::context::ShellContext;
use minishell_rs::environment::Environment;
use minishell_rs::executor::{ProcessExecutor, status};
use minishell_rs::prompt::ShellPrompt;
use minishell_rs::repl::Shell;
use minishell_rs::signal;

#[derive(FromArgs)]
/// A small interactive shell with pipes, redirections and variable expansion.
struct Args {
    /// run COMMAND and exit with its status
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// read settings (prompt, log, env.NAME) from this file
    #[argh(option)]
    config: Option<PathBuf>,
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env("MINISHELL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.log.as_deref().unwrap_or("off")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => match ConfigLoader::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("minishell: {}: {}", path.display(), e);
                std::process::exit(status::SYNTAX_ERROR);
            }
        },
        None => ConfigLoader::default_config(),
    };
    init_logging(&config);

    let mut env = Environment::new();
    for (name, value) in &config.env_vars {
        env.set_exported(name, value);
    }
    let mut shell = Shell::new(ShellContext::new(env), ProcessExecutor::new());

    let code = match args.command {
        Some(line) => shell.run_line(&line),
        None => {
            let mut prompt = ShellPrompt::stdin(&config.prompt);
            if prompt.is_interactive() {
                if let Err(e) = signal::install_interactive_handlers(prompt.prompt()) {
                    tracing::warn!(error = %e, "could not install signal handlers");
                }
            }
            shell.run(&mut prompt)
        }
    };
    std::process::exit(code);
}
