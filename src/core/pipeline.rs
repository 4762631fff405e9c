// src/core/pipeline.rs

//! # Step Pipeline
//!
//! An ordered list of named tasks run sequentially against a shared context, split
//! into three phases:
//!
//! - **preliminary** tasks always run, in order;
//! - **main** tasks run in order, except those in the caller's exclusion set;
//! - **cleanup** tasks run on the way out, whether or not an earlier task failed.
//!
//! The first failing task aborts the preliminary and main phases. Every cleanup task
//! still runs; the first cleanup failure is reported only if nothing failed before.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Inserting task '{task}' requires either an 'after' or a 'before' anchor.")]
    MissingPosition { task: String },
    #[error("Inserting task '{task}' accepts an 'after' or a 'before' anchor, not both.")]
    AmbiguousPosition { task: String },
    #[error("Can't position a task relative to '{anchor}': no such task.")]
    UnknownAnchor { anchor: String },
    #[error("Task '{task}' is already part of the pipeline.")]
    DuplicateTask { task: String },
    #[error("Unknown task '{task}'.")]
    UnknownTask { task: String },
}

/// A step of the pipeline.
pub type TaskFn<C> = fn(&mut C) -> Result<()>;

pub struct Task<C> {
    pub name: &'static str,
    pub run: TaskFn<C>,
}

impl<C> Task<C> {
    pub const fn new(name: &'static str, run: TaskFn<C>) -> Self {
        Self { name, run }
    }
}

impl<C> Clone for Task<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Task<C> {}

impl<C> fmt::Debug for Task<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Task").field(&self.name).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preliminary,
    Main,
    Cleanup,
}

pub struct Pipeline<C> {
    preliminary: Vec<Task<C>>,
    main: Vec<Task<C>>,
    cleanup: Vec<Task<C>>,
}

impl<C> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("preliminary", &self.preliminary)
            .field("main", &self.main)
            .field("cleanup", &self.cleanup)
            .finish()
    }
}

impl<C> Default for Pipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Pipeline<C> {
    pub fn new() -> Self {
        Self {
            preliminary: Vec::new(),
            main: Vec::new(),
            cleanup: Vec::new(),
        }
    }

    fn list(&self, phase: Phase) -> &Vec<Task<C>> {
        match phase {
            Phase::Preliminary => &self.preliminary,
            Phase::Main => &self.main,
            Phase::Cleanup => &self.cleanup,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<Task<C>> {
        match phase {
            Phase::Preliminary => &mut self.preliminary,
            Phase::Main => &mut self.main,
            Phase::Cleanup => &mut self.cleanup,
        }
    }

    pub fn task_names(&self, phase: Phase) -> Vec<&'static str> {
        self.list(phase).iter().map(|t| t.name).collect()
    }

    pub fn contains(&self, phase: Phase, name: &str) -> bool {
        self.list(phase).iter().any(|t| t.name == name)
    }

    /// Appends a task at the end of a phase.
    pub fn push(&mut self, phase: Phase, task: Task<C>) -> Result<(), PipelineError> {
        if self.contains(phase, task.name) {
            return Err(PipelineError::DuplicateTask {
                task: task.name.to_string(),
            });
        }
        self.list_mut(phase).push(task);
        Ok(())
    }

    /// Inserts a task right after or right before an existing one.
    /// Exactly one of `after` and `before` must be given.
    pub fn add_task(
        &mut self,
        phase: Phase,
        task: Task<C>,
        after: Option<&str>,
        before: Option<&str>,
    ) -> Result<(), PipelineError> {
        let (anchor, offset) = match (after, before) {
            (Some(anchor), None) => (anchor, 1),
            (None, Some(anchor)) => (anchor, 0),
            (None, None) => {
                return Err(PipelineError::MissingPosition {
                    task: task.name.to_string(),
                });
            }
            (Some(_), Some(_)) => {
                return Err(PipelineError::AmbiguousPosition {
                    task: task.name.to_string(),
                });
            }
        };

        if self.contains(phase, task.name) {
            return Err(PipelineError::DuplicateTask {
                task: task.name.to_string(),
            });
        }

        let list = self.list_mut(phase);
        let position = list
            .iter()
            .position(|t| t.name == anchor)
            .ok_or_else(|| PipelineError::UnknownAnchor {
                anchor: anchor.to_string(),
            })?;
        list.insert(position + offset, task);
        Ok(())
    }

    /// Removes a task by name. Returns whether it was present.
    pub fn remove(&mut self, phase: Phase, name: &str) -> bool {
        let list = self.list_mut(phase);
        let before = list.len();
        list.retain(|t| t.name != name);
        list.len() != before
    }

    /// Replaces the main phase with the named tasks, in the given order.
    pub fn select_main<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), PipelineError> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let task = self
                .main
                .iter()
                .find(|t| t.name == name)
                .copied()
                .ok_or_else(|| PipelineError::UnknownTask {
                    task: name.to_string(),
                })?;
            selected.push(task);
        }
        self.main = selected;
        Ok(())
    }

    /// Runs every phase against `context`. Main tasks named in `skipped` are not run.
    pub fn run(&self, context: &mut C, skipped: &HashSet<String>) -> Result<()> {
        let outcome = self.run_body(context, skipped);

        let mut cleanup_error = None;
        for task in &self.cleanup {
            if let Err(e) = run_task(task, context) {
                log::warn!("Cleanup task '{}' failed: {:#}", task.name, e);
                cleanup_error.get_or_insert(e);
            }
        }

        outcome?;
        cleanup_error.map_or(Ok(()), Err)
    }

    fn run_body(&self, context: &mut C, skipped: &HashSet<String>) -> Result<()> {
        for task in &self.preliminary {
            run_task(task, context)?;
        }
        for task in &self.main {
            if skipped.contains(task.name) {
                log::debug!("Skipping task '{}'.", task.name);
                continue;
            }
            run_task(task, context)?;
        }
        Ok(())
    }
}

fn run_task<C>(task: &Task<C>, context: &mut C) -> Result<()> {
    log::debug!("Running task '{}'.", task.name);
    (task.run)(context).with_context(|| format!("Task '{}' failed", task.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[derive(Default)]
    struct Trace {
        ran: Vec<&'static str>,
    }

    fn a(t: &mut Trace) -> Result<()> {
        t.ran.push("a");
        Ok(())
    }
    fn b(t: &mut Trace) -> Result<()> {
        t.ran.push("b");
        Err(anyhow!("b broke"))
    }
    fn c(t: &mut Trace) -> Result<()> {
        t.ran.push("c");
        Ok(())
    }
    fn prep(t: &mut Trace) -> Result<()> {
        t.ran.push("prep");
        Ok(())
    }
    fn undo(t: &mut Trace) -> Result<()> {
        t.ran.push("undo");
        Ok(())
    }
    fn undo_fails(t: &mut Trace) -> Result<()> {
        t.ran.push("undo_fails");
        Err(anyhow!("cleanup broke"))
    }

    fn pipeline(main: &[Task<Trace>]) -> Pipeline<Trace> {
        let mut p = Pipeline::new();
        p.push(Phase::Preliminary, Task::new("prep", prep)).unwrap();
        for task in main {
            p.push(Phase::Main, *task).unwrap();
        }
        p.push(Phase::Cleanup, Task::new("undo", undo)).unwrap();
        p
    }

    #[test]
    fn test_failure_stops_main_phase_but_runs_cleanup_once() {
        let p = pipeline(&[Task::new("a", a), Task::new("b", b), Task::new("c", c)]);
        let mut trace = Trace::default();
        let err = p.run(&mut trace, &HashSet::new()).unwrap_err();

        assert_eq!(trace.ran, vec!["prep", "a", "b", "undo"]);
        assert_eq!(err.to_string(), "Task 'b' failed");
        assert_eq!(err.root_cause().to_string(), "b broke");
    }

    #[test]
    fn test_skipped_tasks_are_not_run() {
        let p = pipeline(&[Task::new("a", a), Task::new("b", b), Task::new("c", c)]);
        let mut trace = Trace::default();
        let skipped: HashSet<String> = ["b".to_string()].into_iter().collect();
        p.run(&mut trace, &skipped).unwrap();
        assert_eq!(trace.ran, vec!["prep", "a", "c", "undo"]);
    }

    #[test]
    fn test_all_cleanup_tasks_run_and_first_error_wins() {
        let mut p = pipeline(&[Task::new("b", b)]);
        p.add_task(Phase::Cleanup, Task::new("undo_fails", undo_fails), None, Some("undo"))
            .unwrap();

        let mut trace = Trace::default();
        let err = p.run(&mut trace, &HashSet::new()).unwrap_err();
        assert_eq!(trace.ran, vec!["prep", "b", "undo_fails", "undo"]);
        assert_eq!(err.root_cause().to_string(), "b broke");

        let mut p = pipeline(&[Task::new("a", a)]);
        p.push(Phase::Cleanup, Task::new("undo_fails", undo_fails)).unwrap();
        let mut trace = Trace::default();
        let err = p.run(&mut trace, &HashSet::new()).unwrap_err();
        assert_eq!(err.root_cause().to_string(), "cleanup broke");
    }

    #[test]
    fn test_add_task_positions() {
        let mut p = pipeline(&[Task::new("a", a), Task::new("c", c)]);
        p.add_task(Phase::Main, Task::new("b", b), Some("a"), None).unwrap();
        assert_eq!(p.task_names(Phase::Main), vec!["a", "b", "c"]);

        p.remove(Phase::Main, "b");
        p.add_task(Phase::Main, Task::new("b", b), None, Some("a")).unwrap();
        assert_eq!(p.task_names(Phase::Main), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_add_task_argument_errors() {
        let mut p = pipeline(&[Task::new("a", a)]);
        assert_eq!(
            p.add_task(Phase::Main, Task::new("c", c), None, None),
            Err(PipelineError::MissingPosition { task: "c".into() })
        );
        assert_eq!(
            p.add_task(Phase::Main, Task::new("c", c), Some("a"), Some("a")),
            Err(PipelineError::AmbiguousPosition { task: "c".into() })
        );
        assert_eq!(
            p.add_task(Phase::Main, Task::new("c", c), Some("zzz"), None),
            Err(PipelineError::UnknownAnchor { anchor: "zzz".into() })
        );
        assert_eq!(
            p.add_task(Phase::Main, Task::new("a", a), Some("a"), None),
            Err(PipelineError::DuplicateTask { task: "a".into() })
        );
    }

    #[test]
    fn test_select_main_reorders_and_rejects_unknown() {
        let mut p = pipeline(&[Task::new("a", a), Task::new("b", b), Task::new("c", c)]);
        p.select_main(&["c", "a"]).unwrap();
        assert_eq!(p.task_names(Phase::Main), vec!["c", "a"]);
        assert_eq!(
            p.select_main(&["nope"]),
            Err(PipelineError::UnknownTask { task: "nope".into() })
        );
    }
}
