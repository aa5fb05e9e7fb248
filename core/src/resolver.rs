//! Virtual environment and interpreter discovery.
//!
//! A [`Resolver`] is built once per invocation and passed to every task. Both
//! lookups are memoized: once a value is known it is returned as-is for the
//! rest of the run, even if the filesystem changes underneath.

use crate::config::Config;
use crate::runner::{CommandRunner, Invocation};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of looking for an existing environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvLookup {
    /// Path of the activation file that was found.
    Found(PathBuf),
    /// No candidate root holds `bin/activate`.
    Missing,
}

impl EnvLookup {
    /// Activation file, when one was found.
    pub fn activate(&self) -> Option<&Path> {
        match self {
            EnvLookup::Found(path) => Some(path),
            EnvLookup::Missing => None,
        }
    }

    /// Environment root: the directory holding `bin/activate`.
    pub fn root(&self) -> Option<&Path> {
        self.activate()
            .and_then(Path::parent)
            .and_then(Path::parent)
    }

    /// Whether an environment was found.
    pub fn is_found(&self) -> bool {
        matches!(self, EnvLookup::Found(_))
    }
}

/// Per-invocation cache of the environment and interpreter lookups.
#[derive(Debug, Clone)]
pub struct Resolver {
    project_dir: PathBuf,
    env_roots: Vec<String>,
    interpreters: Vec<String>,
    activate: Option<PathBuf>,
    interpreter: Option<String>,
}

impl Resolver {
    /// Create a resolver for `project_dir`.
    ///
    /// The project directory is made absolute against the current directory,
    /// so paths derived from it stay valid for children spawned elsewhere.
    /// `venv_dir` is probed after the configured roots when it is not one of
    /// them, so an environment created by `setup` is always found again.
    pub fn new(project_dir: impl Into<PathBuf>, config: &Config) -> Self {
        let project_dir = project_dir.into();
        let project_dir = std::path::absolute(&project_dir).unwrap_or(project_dir);

        let mut env_roots = config.env_roots.clone();
        if !env_roots.iter().any(|root| root == &config.venv_dir) {
            env_roots.push(config.venv_dir.clone());
        }

        Self {
            project_dir,
            env_roots,
            interpreters: config.interpreters.clone(),
            activate: None,
            interpreter: None,
        }
    }

    /// Absolute project directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Find the environment's activation file.
    ///
    /// Candidate roots are probed in configured order and the first one with
    /// a `bin/activate` file wins. A miss is not cached, so a later call can
    /// pick up an environment created in the meantime.
    pub fn resolve_environment(&mut self) -> EnvLookup {
        if let Some(path) = &self.activate {
            return EnvLookup::Found(path.clone());
        }

        for root in &self.env_roots {
            let activate = self.project_dir.join(root).join("bin").join("activate");
            debug!(candidate = %activate.display(), "probing for environment");
            if activate.is_file() {
                info!(activate = %activate.display(), "found virtual environment");
                self.activate = Some(activate.clone());
                return EnvLookup::Found(activate);
            }
        }

        debug!("no virtual environment found");
        EnvLookup::Missing
    }

    /// Like [`resolve_environment`](Self::resolve_environment), but a miss is
    /// an [`Error::EnvironmentNotFound`].
    pub fn require_environment(&mut self) -> Result<PathBuf> {
        match self.resolve_environment() {
            EnvLookup::Found(path) => Ok(path),
            EnvLookup::Missing => Err(Error::EnvironmentNotFound {
                candidates: self.env_roots.clone(),
            }),
        }
    }

    /// Pick the first interpreter that answers `--version` with exit status 0.
    ///
    /// Selecting one also pre-warms the environment cache.
    pub fn resolve_interpreter(&mut self, runner: &dyn CommandRunner) -> Result<&str> {
        if self.interpreter.is_none() {
            let selected = self.probe_interpreters(runner)?;
            self.interpreter = Some(selected);
            self.resolve_environment();
        }
        Ok(self.interpreter.as_deref().unwrap_or_default())
    }

    fn probe_interpreters(&self, runner: &dyn CommandRunner) -> Result<String> {
        for candidate in &self.interpreters {
            let probe = Invocation::new(candidate.as_str(), ["--version"])
                .current_dir(&self.project_dir)
                .hidden();
            match runner.run(&probe) {
                Ok(outcome) if outcome.success() => {
                    info!(interpreter = %candidate, "selected interpreter");
                    return Ok(candidate.clone());
                }
                Ok(outcome) => debug!(interpreter = %candidate, code = ?outcome.code, "interpreter rejected"),
                Err(err @ Error::Spawn { .. }) => {
                    debug!(interpreter = %candidate, error = %err, "interpreter unavailable");
                }
                Err(err) => return Err(err),
            }
        }
        Err(Error::InterpreterNotFound {
            candidates: self.interpreters.clone(),
        })
    }
}
