use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use venvtask_core::{run_checked, Invocation, SystemRunner};

#[derive(Debug, Parser)]
#[command(about = "Utility tasks for developing the venvtask workspace")]
struct Xtask {
    /// Task to run; runs `check` then `test` when omitted.
    task: Option<Task>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Task {
    Format,
    Check,
    Test,
    Build,
}

impl Task {
    fn cargo_args(self) -> &'static [&'static str] {
        match self {
            Task::Format => &["fmt", "--all"],
            Task::Check => &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
            Task::Test => &["test", "--workspace"],
            Task::Build => &["build", "--workspace", "--release"],
        }
    }
}

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().map(PathBuf::from).unwrap_or(manifest_dir)
}

fn main() -> Result<()> {
    let cli = Xtask::parse();
    let tasks = match cli.task {
        Some(task) => vec![task],
        None => vec![Task::Check, Task::Test],
    };

    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
    let root = workspace_root();
    for task in tasks {
        let invocation = Invocation::new(cargo.as_str(), task.cargo_args().iter().copied())
            .current_dir(&root);
        println!("xtask: {invocation}");
        run_checked(&SystemRunner, &invocation)?;
    }
    Ok(())
}
