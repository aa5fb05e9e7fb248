use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use venvtask_core::config::discover_config;
use venvtask_core::{Session, SystemRunner, TaskRegistry};

/// Virtual environment and packaging tasks for a Python project.
#[derive(Debug, Parser)]
#[command(name = "venvtask", version)]
struct Cli {
    /// Path to a venvtask config file (defaults to ./venvtask.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Project directory to operate on.
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project_dir: PathBuf,
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    task: Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Task {
    /// Sets up a virtual environment and installs requirements
    Setup,
    /// Cleans the dist and build directories (runs setup first)
    Clean,
    /// Builds source and binary wheels (runs setup and clean first)
    Build,
    /// Uploads the built wheels to the package index (runs the full chain)
    Deploy,
    /// Removes the virtual environment
    Unsetup,
    /// Lists the available tasks and their prerequisites
    List,
}

impl Task {
    fn name(self) -> &'static str {
        match self {
            Task::Setup => "setup",
            Task::Clean => "clean",
            Task::Build => "build",
            Task::Deploy => "deploy",
            Task::Unsetup => "unsetup",
            Task::List => "list",
        }
    }
}

fn init_logging(verbose: bool, default_level: &str) {
    let level = if verbose { "debug" } else { default_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_tasks(registry: &TaskRegistry) {
    for task in registry.tasks() {
        let pre = if task.prerequisites.is_empty() {
            String::new()
        } else {
            format!(" (after {})", task.prerequisites.join(", "))
        };
        println!("{:<8} {}{}", task.name, task.description, pre);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) = discover_config(cli.config.as_deref(), &cli.project_dir)
        .context("failed to load configuration")?;
    init_logging(cli.verbose, &config.log_level);
    debug!(config = ?source, project = %cli.project_dir.display(), "configuration loaded");

    let runner = SystemRunner::new();
    let mut session = Session::new(&cli.project_dir, config, &runner);

    if cli.task == Task::List {
        print_tasks(session.registry());
        return Ok(());
    }

    session.run(cli.task.name())?;
    Ok(())
}
