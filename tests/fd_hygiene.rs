//! Kept in its own test binary: descriptor counts are only meaningful while
//! no other test thread is opening files.

#![cfg(target_os = "linux")]

use std::fs;
use minishell_rs::context::ShellContext;
use minishell_rs::environment::Environment;
use minishell_rs::executor::ProcessExecutor;
use minishell_rs::repl::Shell;

fn open_descriptors() -> usize {
    fs::read_dir("/proc/self/fd").map(|dir| dir.count()).unwrap()
}

#[test]
fn pipelines_do_not_leak_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out").display().to_string();
    let env = Environment::from_exported([("PATH", "/usr/bin:/bin")]);
    let mut shell = Shell::new(ShellContext::new(env), ProcessExecutor::new());

    // Warm up once so lazily opened handles are already counted.
    shell.run_line("true | true");
    let before = open_descriptors();

    for _ in 0..10 {
        assert_eq!(shell.run_line("echo a | cat | tr a b | cat"), 0);
        assert_eq!(shell.run_line(&format!("echo a | cat > {}", out)), 0);
        assert_eq!(shell.run_line(&format!("echo b >> {}", out)), 0);
        assert_eq!(shell.run_line(&format!("cat < {} | no-such-command-xyz", out)), 127);
    }

    assert_eq!(open_descriptors(), before);
    assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");
}
