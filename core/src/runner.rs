//! Command runner abstractions.
//!
//! Every external tool venvtask drives goes through [`CommandRunner`], so the
//! task logic can be exercised without spawning real processes.

use crate::{Error, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// A fixed program + argument list, optionally run inside an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name, looked up on `PATH`.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<String>,
    /// Environment root; `<root>/bin` is put first on `PATH` when set.
    /// A relative root is taken relative to the caller's directory, not `cwd`.
    pub env_root: Option<PathBuf>,
    /// Working directory of the child.
    pub cwd: Option<PathBuf>,
    /// Capture output instead of streaming it to the terminal.
    pub hidden: bool,
}

impl Invocation {
    /// Build an invocation of `program` with `args`, visible and outside any environment.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env_root: None,
            cwd: None,
            hidden: false,
        }
    }

    /// Run inside the environment rooted at `root`.
    pub fn in_env(mut self, root: impl Into<PathBuf>) -> Self {
        self.env_root = Some(root.into());
        self
    }

    /// Run with `dir` as the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Capture the child's output and log it at debug level.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit outcome of a finished invocation. `code` is `None` when the process
/// was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub code: Option<i32>,
}

impl Outcome {
    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Trait describing how to execute external commands.
///
/// Implementations return `Ok` for any process that ran to completion,
/// whatever its exit status; `Err` means it could not be run at all.
pub trait CommandRunner {
    /// Run `invocation` to completion.
    fn run(&self, invocation: &Invocation) -> Result<Outcome>;
}

/// Run and treat a non-zero exit as failure.
pub fn run_checked(runner: &dyn CommandRunner, invocation: &Invocation) -> Result<()> {
    let outcome = runner.run(invocation)?;
    if outcome.success() {
        Ok(())
    } else {
        Err(Error::CommandFailed {
            command: invocation.to_string(),
            code: outcome.code,
        })
    }
}

/// Runs invocations as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Helper constructor for the system runner.
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Result<Command> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        if let Some(root) = &invocation.env_root {
            // The child resolves PATH after changing into `cwd`.
            let root = std::path::absolute(root)?;
            cmd.env("PATH", activated_path(&root)?);
            cmd.env("VIRTUAL_ENV", &root);
            cmd.env_remove("PYTHONHOME");
        }
        Ok(cmd)
    }
}

/// `PATH` with the environment's `bin` directory in front, mirroring what
/// sourcing `bin/activate` does.
fn activated_path(root: &Path) -> Result<OsString> {
    let mut entries = vec![root.join("bin")];
    if let Some(current) = std::env::var_os("PATH") {
        entries.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(entries)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<Outcome> {
        let mut cmd = Self::command(invocation)?;
        debug!(command = %invocation, env = ?invocation.env_root, "spawning");

        let spawn_err = |source| Error::Spawn {
            command: invocation.to_string(),
            source,
        };

        let status = if invocation.hidden {
            let output = cmd
                .stdin(Stdio::null())
                .output()
                .map_err(spawn_err)?;
            if !output.stdout.is_empty() {
                debug!(command = %invocation, "stdout:\n{}", String::from_utf8_lossy(&output.stdout));
            }
            if !output.stderr.is_empty() {
                debug!(command = %invocation, "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
            }
            output.status
        } else {
            cmd.status().map_err(spawn_err)?
        };

        debug!(command = %invocation, code = ?status.code(), "finished");
        Ok(Outcome {
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new("pip", ["install", "-U", "pip"]);
        assert_eq!(inv.to_string(), "pip install -U pip");
    }

    #[test]
    fn activated_path_puts_env_bin_first() {
        let path = activated_path(Path::new("/proj/.venv")).unwrap();
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, PathBuf::from("/proj/.venv/bin"));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_codes() {
        let runner = SystemRunner::new();
        let ok = runner.run(&Invocation::new("true", Vec::<String>::new()).hidden()).unwrap();
        assert!(ok.success());

        let failed = runner.run(&Invocation::new("false", Vec::<String>::new()).hidden()).unwrap();
        assert!(!failed.success());
        assert_eq!(failed.code, Some(1));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&Invocation::new("venvtask-definitely-not-a-program", ["--version"]).hidden())
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn run_checked_maps_non_zero_to_failure() {
        let err = run_checked(&SystemRunner, &Invocation::new("false", Vec::<String>::new()).hidden())
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[test]
    fn relative_env_root_resolves_against_caller_dir() {
        use std::os::unix::fs::PermissionsExt;

        let scratch = tempfile::Builder::new()
            .prefix("venvtask-runner-")
            .tempdir_in(".")
            .unwrap();
        let project = PathBuf::from(scratch.path().file_name().unwrap());
        let bin = project.join(".venv").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let tool = bin.join("venvtask-env-only-tool");
        std::fs::write(&tool, "#!/bin/sh\ntest -n \"$VIRTUAL_ENV\" && test -d \"$VIRTUAL_ENV/bin\"\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let invocation = Invocation::new("venvtask-env-only-tool", Vec::<String>::new())
            .in_env(project.join(".venv"))
            .current_dir(&project)
            .hidden();
        let outcome = SystemRunner::new().run(&invocation).unwrap();
        assert!(outcome.success());
    }
}
