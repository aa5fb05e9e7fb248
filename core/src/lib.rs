//! Core crate for the venvtask workflow runner.
//!
//! The pieces fit together like this: a [`Config`] describes the project
//! layout, a [`Resolver`] finds (or helps create) the virtual environment,
//! the [`TaskRegistry`] orders tasks by their prerequisites, and a
//! [`Session`] runs the planned steps through a [`CommandRunner`].

pub mod config;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod session;

pub use config::{load_config, Config};
pub use registry::{TaskRegistry, TaskSpec};
pub use resolver::{EnvLookup, Resolver};
pub use runner::{run_checked, CommandRunner, Invocation, Outcome, SystemRunner};
pub use session::{Session, UnsetupReport};

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for the venvtask core.
#[derive(Debug, Error)]
pub enum Error {
    /// None of the candidate interpreters answered `--version` successfully.
    #[error("We need either {} to continue.", join_or(.candidates))]
    InterpreterNotFound { candidates: Vec<String> },

    /// No candidate root holds a `bin/activate` file.
    #[error(
        "You may not have setup a virtual environment (looked in {}), please run `venvtask setup` to create one.",
        .candidates.join(", ")
    )]
    EnvironmentNotFound { candidates: Vec<String> },

    /// An external tool ran but exited non-zero (or was killed).
    #[error("`{command}` failed with {}", describe_code(.code))]
    CommandFailed { command: String, code: Option<i32> },

    /// An external tool could not be started at all.
    #[error("could not start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure while probing or removing directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file that is not valid TOML or has unknown keys.
    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A task name that is not in the registry.
    #[error("unknown task `{0}`")]
    UnknownTask(String),

    /// Prerequisites loop back on themselves; `path` ends where it started.
    #[error("circular task dependency: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    /// `deploy` found nothing to upload.
    #[error("no artifacts to upload in {}", .0.display())]
    NoArtifacts(PathBuf),
}

/// Convenient alias for results returned by the core crate.
pub type Result<T> = std::result::Result<T, Error>;

fn join_or(items: &[String]) -> String {
    let mut sorted = items.to_vec();
    sorted.sort();
    match sorted.as_slice() {
        [] => "a python interpreter".to_string(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "no exit status (terminated by signal)".to_string(),
    }
}
