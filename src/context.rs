use crate::environment::Environment;

/// State shared by every stage and kept across input lines.
#[derive(Debug, Clone, Default)]
pub struct ShellContext {
    pub last_input: String,
    pub env: Environment,
    pub error: bool,
    pub should_exit: bool,
    pub last_status: i32,
}

impl ShellContext {
    pub fn new(env: Environment) -> Self {
        ShellContext {
            env,
            ..Default::default()
        }
    }

    /// Search path used to resolve command names.
    pub fn search_path(&self) -> Option<&str> {
        self.env.get("PATH")
    }
}
