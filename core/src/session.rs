//! Running planned tasks against a project.

use crate::config::Config;
use crate::registry::{TaskRegistry, TaskSpec};
use crate::resolver::{EnvLookup, Resolver};
use crate::runner::{run_checked, CommandRunner, Invocation};
use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What `unsetup` removed and what it expected but did not find.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsetupReport {
    /// Subdirectories that were deleted.
    pub removed: Vec<PathBuf>,
    /// Subdirectories that were already gone.
    pub missing: Vec<PathBuf>,
}

/// One invocation's worth of state: config, resolver cache and runner.
pub struct Session<'r> {
    config: Config,
    resolver: Resolver,
    registry: TaskRegistry,
    runner: &'r dyn CommandRunner,
}

impl<'r> Session<'r> {
    /// Start a session for `project_dir` using the default task table.
    pub fn new(project_dir: impl Into<PathBuf>, config: Config, runner: &'r dyn CommandRunner) -> Self {
        let resolver = Resolver::new(project_dir, &config);
        Self {
            config,
            resolver,
            registry: TaskRegistry::default(),
            runner,
        }
    }

    /// Replace the task table.
    pub fn with_registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Task table used for planning.
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Environment and interpreter lookups made so far.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    fn project_dir(&self) -> &Path {
        self.resolver.project_dir()
    }

    /// Run `target` after its prerequisites. Stops at the first failure;
    /// steps that already ran are not undone.
    pub fn run(&mut self, target: &str) -> Result<()> {
        let plan: Vec<TaskSpec> = self.registry.plan(target)?.into_iter().cloned().collect();
        info!(task = target, steps = ?plan.iter().map(|t| t.name).collect::<Vec<_>>(), "planned");

        for task in &plan {
            debug!(task = task.name, "starting");
            self.run_step(task.name).inspect_err(|err| {
                warn!(task = task.name, error = %err, "task failed");
            })?;
        }
        Ok(())
    }

    fn run_step(&mut self, name: &str) -> Result<()> {
        match name {
            "setup" => self.setup(),
            "clean" => self.clean(),
            "build" => self.build(),
            "deploy" => self.deploy(),
            "unsetup" => self.unsetup().map(|_| ()),
            other => Err(Error::UnknownTask(other.to_string())),
        }
    }

    /// Ensure an environment exists, then refresh the installer and install
    /// requirements into it.
    pub fn setup(&mut self) -> Result<()> {
        let root = match self.resolver.resolve_environment() {
            EnvLookup::Found(activate) => env_root(&activate),
            EnvLookup::Missing => self.create_environment()?,
        };

        println!("upgrading pip");
        self.run_in_env(
            &root,
            Invocation::new("pip", ["install", "-U", "pip", "setuptools", "wheel"]).hidden(),
        )?;

        println!("installing requirements");
        self.run_in_env(
            &root,
            Invocation::new("pip", ["install", "-r", self.config.requirements.as_str()]).hidden(),
        )
    }

    fn create_environment(&mut self) -> Result<PathBuf> {
        println!("setting up virtual environment");
        let python = self.resolver.resolve_interpreter(self.runner)?.to_string();
        let create = Invocation::new(python, ["-m", "venv", self.config.venv_dir.as_str()])
            .current_dir(self.project_dir())
            .hidden();
        run_checked(self.runner, &create)?;

        let activate = self.resolver.require_environment()?;
        Ok(env_root(&activate))
    }

    /// Remove the build output directories. Absent ones are skipped.
    pub fn clean(&mut self) -> Result<()> {
        println!("cleaning");
        for dir in &self.config.output_dirs {
            let path = self.project_dir().join(dir);
            match fs::remove_dir_all(&path) {
                Ok(()) => info!(path = %path.display(), "removed"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "nothing to remove");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Build sdist and wheel artifacts with the environment's interpreter.
    pub fn build(&mut self) -> Result<()> {
        println!("building");
        let root = self.environment_root()?;
        self.run_in_env(
            &root,
            Invocation::new("python", ["setup.py", "sdist", "bdist_wheel"]).hidden(),
        )
    }

    /// Upload everything in the dist directory with twine.
    pub fn deploy(&mut self) -> Result<()> {
        println!("deploying");
        let root = self.environment_root()?;
        let artifacts = self.artifacts()?;

        let mut args = vec!["upload".to_string()];
        if let Some(repository) = &self.config.repository {
            args.push("--repository".to_string());
            args.push(repository.clone());
        }
        args.extend(artifacts.iter().map(|p| p.display().to_string()));

        self.run_in_env(&root, Invocation::new("twine", args))
    }

    fn artifacts(&self) -> Result<Vec<PathBuf>> {
        let dist = self.project_dir().join(&self.config.dist_dir);
        let entries = match fs::read_dir(&dist) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NoArtifacts(dist));
            }
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                files.push(Path::new(&self.config.dist_dir).join(path.file_name().unwrap_or_default()));
            }
        }
        if files.is_empty() {
            return Err(Error::NoArtifacts(dist));
        }
        files.sort();
        Ok(files)
    }

    /// Remove the environment's subdirectories.
    ///
    /// Fails without touching anything when no environment resolves. On a
    /// partial environment the present subdirectories are removed and the
    /// missing ones are reported.
    pub fn unsetup(&mut self) -> Result<UnsetupReport> {
        println!("removing virtual environment");
        let root = self.environment_root()?;
        let mut report = UnsetupReport::default();

        for sub in &self.config.env_subdirs {
            let path = root.join(sub);
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "removed");
                    report.removed.push(path);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    warn!(path = %path.display(), "expected environment directory is missing");
                    println!("  {} was already missing", path.display());
                    report.missing.push(path);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(report)
    }

    fn environment_root(&mut self) -> Result<PathBuf> {
        let activate = self.resolver.require_environment()?;
        Ok(env_root(&activate))
    }

    fn run_in_env(&self, root: &Path, invocation: Invocation) -> Result<()> {
        let invocation = invocation.in_env(root).current_dir(self.project_dir());
        run_checked(self.runner, &invocation)
    }
}

/// `<root>/bin/activate` -> `<root>`
fn env_root(activate: &Path) -> PathBuf {
    activate
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
