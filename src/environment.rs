use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
struct Variable {
    value: String,
    exported: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    vars: HashMap<String, Variable>,
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Environment {
    /// Imports every variable of the current process as exported.
    pub fn new() -> Self {
        Self::from_exported(std::env::vars())
    }

    pub fn empty() -> Self {
        Environment::default()
    }

    pub fn from_exported<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Environment::empty();
        for (k, v) in vars {
            env.vars.insert(
                k.into(),
                Variable {
                    value: v.into(),
                    exported: true,
                },
            );
        }
        env
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.value.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars
            .entry(key.to_string())
            .and_modify(|var| var.value = value.to_string())
            .or_insert(Variable {
                value: value.to_string(),
                exported: false,
            });
    }

    pub fn set_exported(&mut self, key: &str, value: &str) {
        self.set(key, value);
        self.export(key);
    }

    pub fn unset(&mut self, key: &str) {
        self.vars.remove(key);
    }

    pub fn export(&mut self, key: &str) {
        if let Some(var) = self.vars.get_mut(key) {
            var.exported = true;
        }
    }

    pub fn is_exported(&self, key: &str) -> bool {
        self.vars.get(key).is_some_and(|v| v.exported)
    }

    /// Exported variables sorted by name.
    pub fn exported_vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = self
            .vars
            .iter()
            .filter(|(_, v)| v.exported)
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect();
        vars.sort();
        vars
    }

    /// `NAME=VALUE` strings handed to a spawned child.
    pub fn envp(&self) -> Vec<String> {
        self.exported_vars()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}
