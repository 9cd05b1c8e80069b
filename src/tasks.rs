//! Named tasks made of ordered steps.
//!
//! Tasks and primitive steps share one namespace. A task's step ids resolve
//! either to a registered step closure or to another task, which is expanded in
//! place. Execution is strictly sequential and stops at the first failure.

use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// A primitive action that a task can run
pub type Step<'a> = Box<dyn FnMut() -> Result<()> + 'a>;

/// Registry of tasks and steps
#[derive(Default)]
pub struct TaskGraph<'a> {
    order: Vec<String>,
    tasks: HashMap<String, Vec<String>>,
    steps: HashMap<String, Step<'a>>,
}

impl<'a> TaskGraph<'a> {
    pub fn new() -> Self {
        TaskGraph {
            order: Vec::new(),
            tasks: HashMap::new(),
            steps: HashMap::new(),
        }
    }

    fn is_registered(&self, name: &str) -> bool {
        self.tasks.contains_key(name) || self.steps.contains_key(name)
    }

    /// Register a task as an ordered list of step or task names.
    pub fn register_task<I, S>(&mut self, name: &str, steps: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.is_registered(name) {
            return Err(PipelineError::DuplicateTask(name.to_string()));
        }
        self.tasks
            .insert(name.to_string(), steps.into_iter().map(Into::into).collect());
        self.order.push(name.to_string());
        Ok(())
    }

    /// Register a primitive step.
    pub fn register_step<F>(&mut self, name: &str, step: F) -> Result<()>
    where
        F: FnMut() -> Result<()> + 'a,
    {
        if self.is_registered(name) {
            return Err(PipelineError::DuplicateTask(name.to_string()));
        }
        self.steps.insert(name.to_string(), Box::new(step));
        Ok(())
    }

    /// Tasks in registration order with their declared steps
    pub fn tasks(&self) -> Vec<(&str, &[String])> {
        self.order
            .iter()
            .filter_map(|name| {
                self.tasks
                    .get(name)
                    .map(|steps| (name.as_str(), steps.as_slice()))
            })
            .collect()
    }

    /// Check that every step id resolves and that no task reaches itself.
    pub fn validate(&self) -> Result<()> {
        for name in &self.order {
            self.check(name, &mut Vec::new())?;
        }
        Ok(())
    }

    fn check(&self, name: &str, stack: &mut Vec<String>) -> Result<()> {
        if stack.iter().any(|t| t == name) {
            return Err(PipelineError::TaskCycle(name.to_string()));
        }
        let Some(steps) = self.tasks.get(name) else {
            return Ok(());
        };
        stack.push(name.to_string());
        for step in steps {
            if !self.is_registered(step) {
                return Err(PipelineError::UnresolvedStep {
                    task: name.to_string(),
                    step: step.clone(),
                });
            }
            self.check(step, stack)?;
        }
        stack.pop();
        Ok(())
    }

    /// Run a task and return the primitive steps executed, in order.
    ///
    /// The first failing step aborts the run with [`PipelineError::StepFailed`];
    /// nothing after it is executed.
    pub fn run(&mut self, name: &str) -> Result<Vec<String>> {
        if !self.tasks.contains_key(name) {
            return Err(PipelineError::UnknownTask(name.to_string()));
        }
        self.check(name, &mut Vec::new())?;
        let mut executed = Vec::new();
        self.run_task(name, &mut Vec::new(), &mut executed)?;
        Ok(executed)
    }

    fn run_task(
        &mut self,
        name: &str,
        stack: &mut Vec<String>,
        executed: &mut Vec<String>,
    ) -> Result<()> {
        if stack.iter().any(|t| t == name) {
            return Err(PipelineError::TaskCycle(name.to_string()));
        }
        let steps = self
            .tasks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownTask(name.to_string()))?;

        tracing::debug!(task = name, ?steps, "running task");
        stack.push(name.to_string());
        for step in &steps {
            if self.tasks.contains_key(step) {
                self.run_task(step, stack, executed)?;
                continue;
            }
            let action = self
                .steps
                .get_mut(step)
                .ok_or_else(|| PipelineError::UnresolvedStep {
                    task: name.to_string(),
                    step: step.clone(),
                })?;

            tracing::info!(step = step.as_str(), "running step");
            action().map_err(|e| PipelineError::StepFailed {
                step: step.clone(),
                source: Box::new(e),
            })?;
            executed.push(step.clone());
        }
        stack.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_runs_steps_in_declared_order() {
        let log = RefCell::new(Vec::new());
        let mut graph = TaskGraph::new();
        graph
            .register_step("sass", || {
                log.borrow_mut().push("sass");
                Ok(())
            })
            .unwrap();
        graph
            .register_step("assertions", || {
                log.borrow_mut().push("assertions");
                Ok(())
            })
            .unwrap();
        graph
            .register_step("concat", || {
                log.borrow_mut().push("concat");
                Ok(())
            })
            .unwrap();
        graph.register_task("test", ["sass", "assertions"]).unwrap();
        graph.register_task("build", ["test", "concat"]).unwrap();

        let executed = graph.run("build").unwrap();
        drop(graph);

        assert_eq!(executed, vec!["sass", "assertions", "concat"]);
        assert_eq!(*log.borrow(), vec!["sass", "assertions", "concat"]);
    }

    #[test]
    fn test_first_failure_stops_the_task() {
        let ran_concat = RefCell::new(false);
        let mut graph = TaskGraph::new();
        graph
            .register_step("sass", || {
                Err(PipelineError::tool("sass", "Undefined mixin"))
            })
            .unwrap();
        graph
            .register_step("concat", || {
                *ran_concat.borrow_mut() = true;
                Ok(())
            })
            .unwrap();
        graph.register_task("build", ["sass", "concat"]).unwrap();

        let err = graph.run("build").unwrap_err();
        drop(graph);

        match err {
            PipelineError::StepFailed { step, source } => {
                assert_eq!(step, "sass");
                assert!(matches!(*source, PipelineError::ExternalTool { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(!*ran_concat.borrow());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut graph = TaskGraph::new();
        graph.register_step("concat", || Ok(())).unwrap();
        graph.register_task("test", ["concat"]).unwrap();

        assert!(matches!(
            graph.register_task("test", ["concat"]),
            Err(PipelineError::DuplicateTask(_))
        ));
        assert!(matches!(
            graph.register_task("concat", Vec::<String>::new()),
            Err(PipelineError::DuplicateTask(_))
        ));
        assert!(matches!(
            graph.register_step("test", || Ok(())),
            Err(PipelineError::DuplicateTask(_))
        ));
    }

    #[test]
    fn test_unknown_task() {
        let mut graph = TaskGraph::new();
        assert!(matches!(
            graph.run("deploy"),
            Err(PipelineError::UnknownTask(name)) if name == "deploy"
        ));
    }

    #[test]
    fn test_unresolved_step_is_fatal_before_anything_runs() {
        let ran = RefCell::new(false);
        let mut graph = TaskGraph::new();
        graph
            .register_step("sass", || {
                *ran.borrow_mut() = true;
                Ok(())
            })
            .unwrap();
        graph.register_task("test", ["sass", "uglify"]).unwrap();

        assert!(matches!(
            graph.validate(),
            Err(PipelineError::UnresolvedStep { .. })
        ));
        let err = graph.run("test").unwrap_err();
        drop(graph);
        assert!(err.is_configuration_error());
        assert!(!*ran.borrow());
    }

    #[test]
    fn test_cycles_are_detected() {
        let mut graph = TaskGraph::new();
        graph.register_task("a", ["b"]).unwrap();
        graph.register_task("b", ["a"]).unwrap();
        assert!(matches!(graph.validate(), Err(PipelineError::TaskCycle(_))));
        assert!(matches!(graph.run("a"), Err(PipelineError::TaskCycle(_))));
    }

    #[test]
    fn test_tasks_listed_in_registration_order() {
        let mut graph = TaskGraph::new();
        graph.register_step("s", || Ok(())).unwrap();
        graph.register_task("test", ["s"]).unwrap();
        graph.register_task("build", ["test"]).unwrap();
        let names: Vec<&str> = graph.tasks().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["test", "build"]);
    }
}
