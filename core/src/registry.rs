//! Task registry and prerequisite planning.

use crate::{Error, Result};
use std::collections::HashSet;

/// Metadata describing one task and what must run before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Name used on the command line.
    pub name: &'static str,
    /// One-line summary shown by `venvtask list`.
    pub description: &'static str,
    /// Direct prerequisites, in the order they should run.
    pub prerequisites: &'static [&'static str],
}

/// The fixed task table: setup -> clean -> build -> deploy, plus unsetup.
pub const TASKS: &[TaskSpec] = &[
    TaskSpec {
        name: "setup",
        description: "Sets up a virtual environment and installs requirements",
        prerequisites: &[],
    },
    TaskSpec {
        name: "clean",
        description: "Cleans the dist and build directories",
        prerequisites: &["setup"],
    },
    TaskSpec {
        name: "build",
        description: "Builds source and binary wheels for deployment",
        prerequisites: &["clean"],
    },
    TaskSpec {
        name: "deploy",
        description: "Deploys source and binary wheels to the package index",
        prerequisites: &["build"],
    },
    TaskSpec {
        name: "unsetup",
        description: "Removes the virtual environment",
        prerequisites: &[],
    },
];

/// Registry handle over a task table.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Vec<TaskSpec>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(TASKS.to_vec())
    }
}

impl TaskRegistry {
    /// Create a registry over an arbitrary task table.
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        Self { tasks }
    }

    /// All tasks, in table order.
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|task| task.name == name)
    }

    /// Order `target` after its transitive prerequisites.
    ///
    /// Depth-first: each prerequisite's own chain is emitted before it, in
    /// declaration order. Every task appears once and `target` comes last.
    pub fn plan(&self, target: &str) -> Result<Vec<&TaskSpec>> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut stack = Vec::new();
        self.visit(target, &mut stack, &mut done, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
        order: &mut Vec<&'a TaskSpec>,
    ) -> Result<()> {
        let task = self
            .get(name)
            .ok_or_else(|| Error::UnknownTask(name.to_string()))?;
        if done.contains(task.name) {
            return Ok(());
        }
        if let Some(pos) = stack.iter().position(|n| *n == task.name) {
            let mut path: Vec<String> = stack[pos..].iter().map(|n| n.to_string()).collect();
            path.push(task.name.to_string());
            return Err(Error::CircularDependency { path });
        }

        stack.push(task.name);
        for prerequisite in task.prerequisites {
            self.visit(prerequisite, stack, done, order)?;
        }
        stack.pop();

        done.insert(task.name);
        order.push(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(plan: &[&TaskSpec]) -> Vec<&'static str> {
        plan.iter().map(|t| t.name).collect()
    }

    #[test]
    fn deploy_runs_whole_chain_once() {
        let registry = TaskRegistry::default();
        let plan = registry.plan("deploy").unwrap();
        assert_eq!(names(&plan), vec!["setup", "clean", "build", "deploy"]);
    }

    #[test]
    fn standalone_tasks_plan_alone() {
        let registry = TaskRegistry::default();
        assert_eq!(names(&registry.plan("setup").unwrap()), vec!["setup"]);
        assert_eq!(names(&registry.plan("unsetup").unwrap()), vec!["unsetup"]);
    }

    #[test]
    fn unknown_task_is_rejected() {
        let registry = TaskRegistry::default();
        assert!(matches!(
            registry.plan("publish"),
            Err(Error::UnknownTask(name)) if name == "publish"
        ));
    }

    #[test]
    fn shared_prerequisites_run_once_in_declaration_order() {
        let registry = TaskRegistry::new(vec![
            TaskSpec { name: "a", description: "", prerequisites: &[] },
            TaskSpec { name: "b", description: "", prerequisites: &["a"] },
            TaskSpec { name: "c", description: "", prerequisites: &["a"] },
            TaskSpec { name: "d", description: "", prerequisites: &["c", "b"] },
        ]);
        assert_eq!(names(&registry.plan("d").unwrap()), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn cycles_are_detected() {
        let registry = TaskRegistry::new(vec![
            TaskSpec { name: "a", description: "", prerequisites: &["c"] },
            TaskSpec { name: "b", description: "", prerequisites: &["a"] },
            TaskSpec { name: "c", description: "", prerequisites: &["b"] },
        ]);
        match registry.plan("a") {
            Err(Error::CircularDependency { path }) => {
                assert_eq!(path, vec!["a", "c", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn dangling_prerequisite_is_unknown() {
        let registry = TaskRegistry::new(vec![TaskSpec {
            name: "build",
            description: "",
            prerequisites: &["compile"],
        }]);
        assert!(matches!(registry.plan("build"), Err(Error::UnknownTask(_))));
    }
}
