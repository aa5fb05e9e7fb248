//! Shared fixtures for the session integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use venvtask_core::{CommandRunner, Invocation, Outcome, Result};

/// A throwaway project directory.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Lay down `<root>/bin/activate` plus `lib` and `include`.
    pub fn with_env(self, root: &str) -> Self {
        let env = self.path().join(root);
        for sub in ["bin", "lib", "include"] {
            fs::create_dir_all(env.join(sub)).unwrap();
        }
        fs::write(env.join("bin").join("activate"), "# activate\n").unwrap();
        self
    }

    pub fn with_file(self, rel: &str, contents: &str) -> Self {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        self
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path().join(rel).exists()
    }
}

/// Fake runner that records every invocation and imitates the tools.
///
/// `python -m venv <dir>` creates an environment skeleton and
/// `python setup.py ...` writes artifacts into `dist/`, unless the program
/// has been scripted to fail.
pub struct ScriptedRunner {
    project: PathBuf,
    pub calls: RefCell<Vec<Invocation>>,
    failing: Vec<(String, i32)>,
    available_interpreters: Vec<String>,
}

impl ScriptedRunner {
    pub fn new(project: &Path) -> Self {
        Self {
            project: project.to_path_buf(),
            calls: RefCell::new(Vec::new()),
            failing: Vec::new(),
            available_interpreters: vec!["python3.7".to_string(), "python3.6".to_string()],
        }
    }

    pub fn with_interpreters(mut self, names: &[&str]) -> Self {
        self.available_interpreters = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Make invocations whose rendered command starts with `prefix` exit with `code`.
    pub fn fail_on(mut self, prefix: &str, code: i32) -> Self {
        self.failing.push((prefix.to_string(), code));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }

    fn simulate(&self, invocation: &Invocation) {
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        match (invocation.program.as_str(), args.as_slice()) {
            (_, ["-m", "venv", dir]) => {
                let env = self.project.join(dir);
                for sub in ["bin", "lib", "include"] {
                    fs::create_dir_all(env.join(sub)).unwrap();
                }
                fs::write(env.join("bin").join("activate"), "").unwrap();
            }
            ("python", ["setup.py", ..]) => {
                let dist = self.project.join("dist");
                fs::create_dir_all(&dist).unwrap();
                fs::create_dir_all(self.project.join("build").join("lib")).unwrap();
                fs::write(dist.join("pkg-0.1.tar.gz"), "sdist").unwrap();
                fs::write(dist.join("pkg-0.1-py3-none-any.whl"), "wheel").unwrap();
            }
            _ => {}
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<Outcome> {
        self.calls.borrow_mut().push(invocation.clone());
        let rendered = invocation.to_string();

        if invocation.args == ["--version"] {
            let code = if self.available_interpreters.contains(&invocation.program) {
                0
            } else {
                127
            };
            return Ok(Outcome { code: Some(code) });
        }

        if let Some((_, code)) = self.failing.iter().find(|(p, _)| rendered.starts_with(p.as_str())) {
            return Ok(Outcome { code: Some(*code) });
        }

        self.simulate(invocation);
        Ok(Outcome { code: Some(0) })
    }
}
