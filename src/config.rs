use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    /// Log filter directive, used when `MINISHELL_LOG` is not set.
    pub log: Option<String>,
    /// Variables exported into the shell environment at startup.
    pub env_vars: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        ConfigLoader::default_config()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("config line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: "minishell$ ".to_string(),
            log: None,
            env_vars: HashMap::new(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let src = fs::read_to_string(path)?;
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = ConfigLoader::default_config();

        for (lineno, line) in src.lines().enumerate() {
            let parse_error = |message: String| ConfigError::Parse {
                line: lineno + 1,
                message,
            };
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(parse_error(format!("no '=' found: {}", line)));
            };
            // The value is kept verbatim so prompts may end in a space.
            match key.trim() {
                "prompt" => config.prompt = value.to_string(),
                "log" => config.log = Some(value.trim().to_string()),
                k if k.starts_with("env.") => {
                    let var = &k["env.".len()..];
                    if !crate::environment::is_valid_name(var) {
                        return Err(parse_error(format!("invalid variable name: {}", var)));
                    }
                    config.env_vars.insert(var.to_string(), value.to_string());
                }
                k => return Err(parse_error(format!("unknown key: {}", k))),
            }
        }

        tracing::debug!(?config, "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ConfigLoader::load_from_str("").unwrap();
        assert_eq!(config, ConfigLoader::default_config());
        assert_eq!(config.prompt, "minishell$ ");
    }

    #[test]
    fn test_keys() {
        let src = "# comment\n\nprompt=> \nlog = debug\nenv.EDITOR=vi\nenv.EMPTY=\n";
        let config = ConfigLoader::load_from_str(src).unwrap();
        assert_eq!(config.prompt, "> ");
        assert_eq!(config.log.as_deref(), Some("debug"));
        assert_eq!(config.env_vars.get("EDITOR").map(String::as_str), Some("vi"));
        assert_eq!(config.env_vars.get("EMPTY").map(String::as_str), Some(""));
    }

    #[test]
    fn test_unknown_key_reports_line() {
        let err = ConfigLoader::load_from_str("prompt=$ \nhistory_max=5\n").unwrap_err();
        match err {
            ConfigError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("history_max"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_equals() {
        let err = ConfigLoader::load_from_str("prompt").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_invalid_env_name() {
        let err = ConfigLoader::load_from_str("env.1X=a").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prompt=% ").unwrap();
        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.prompt, "% ");

        let missing = ConfigLoader::load_from_file("/definitely/not/here.conf").unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
