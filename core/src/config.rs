//! Configuration models and loaders for venvtask.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// File name looked up in the project directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "venvtask.toml";

/// Project layout and tool choices used by every task.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Candidate environment roots, probed in order for `bin/activate`.
    pub env_roots: Vec<String>,
    /// Interpreters tried, in order, when an environment must be created.
    pub interpreters: Vec<String>,
    /// Directory handed to `python -m venv`.
    pub venv_dir: String,
    /// Requirements file consumed by `pip install -r`.
    pub requirements: String,
    /// Directories removed by `clean`.
    pub output_dirs: Vec<String>,
    /// Directory whose files `deploy` uploads.
    pub dist_dir: String,
    /// Subdirectories removed by `unsetup`.
    pub env_subdirs: Vec<String>,
    /// Named index from `.pypirc`; twine's default when unset.
    pub repository: Option<String>,
    /// Default log filter when neither `-v` nor `RUST_LOG` is given.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_roots: strings(&[".", ".wsl", ".venv", "venv"]),
            interpreters: strings(&["python3.7", "python3.6"]),
            venv_dir: ".".to_string(),
            requirements: "requirements.txt".to_string(),
            output_dirs: strings(&["build", "dist"]),
            dist_dir: "dist".to_string(),
            env_subdirs: strings(&["bin", "lib", "include"]),
            repository: None,
            log_level: "warn".to_string(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Load configuration from the provided path.
///
/// Every key is optional; missing keys keep their default. Unknown keys are
/// rejected so typos don't silently fall back to defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the configuration for a project.
///
/// An explicit path must exist. Without one, `venvtask.toml` in the project
/// directory is used when present, and defaults otherwise.
pub fn discover_config(explicit: Option<&Path>, project_dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, Some(path.to_path_buf())));
    }
    let candidate = project_dir.join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        let config = load_config(&candidate)?;
        Ok((config, Some(candidate)))
    } else {
        Ok((Config::default(), None))
    }
}
