use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    /// A matching file exists but cannot be executed.
    NotExecutable(PathBuf),
    NotFound,
}

pub struct PathResolver<'a> {
    search_path: Option<&'a str>,
}

fn is_executable_file(path: &Path) -> Option<bool> {
    let meta = fs::metadata(path).ok()?;
    Some(meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

impl<'a> PathResolver<'a> {
    pub fn new(search_path: Option<&'a str>) -> Self {
        PathResolver { search_path }
    }

    pub fn resolve(&self, command: &str) -> Resolution {
        if command.is_empty() {
            return Resolution::NotFound;
        }

        if command.contains('/') {
            let path = PathBuf::from(command);
            return match is_executable_file(&path) {
                Some(true) => Resolution::Found(path),
                Some(false) => Resolution::NotExecutable(path),
                None => Resolution::NotFound,
            };
        }

        // A non-executable match is only reported when nothing later in
        // the search path can be executed.
        let mut fallback = None;
        if let Some(paths) = self.search_path {
            for dir in env::split_paths(paths) {
                let full_path = dir.join(command);
                match is_executable_file(&full_path) {
                    Some(true) => return Resolution::Found(full_path),
                    Some(false) if full_path.is_file() => {
                        fallback.get_or_insert(full_path);
                    }
                    _ => {}
                }
            }
        }

        fallback.map_or(Resolution::NotFound, Resolution::NotExecutable)
    }
}
