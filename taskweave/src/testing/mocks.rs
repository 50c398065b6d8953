//! Mock tasks for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::TaskError;
use crate::tasks::{Args, Task, TaskResult};

/// A task that records every call and returns a configurable output.
///
/// Without an output set it echoes its arguments.
#[derive(Debug)]
pub struct RecordingTask {
    name: String,
    arity: Option<usize>,
    output: Mutex<Option<Args>>,
    calls: Mutex<Vec<Args>>,
}

impl RecordingTask {
    /// Creates a new recording task.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: None,
            output: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Declares a parameter count, e.g. to act as error middleware.
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Sets the output to return instead of echoing.
    #[must_use]
    pub fn with_output(self, output: Args) -> Self {
        *self.output.lock() = Some(output);
        self
    }

    /// Returns the arguments of every call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Args> {
        self.calls.lock().clone()
    }

    /// Returns the number of times the task was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Task for RecordingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Option<usize> {
        self.arity
    }

    async fn run(&self, args: Args) -> TaskResult {
        self.calls.lock().push(args.clone());
        Ok(self.output.lock().clone().unwrap_or(args))
    }
}

/// A task that always fails immediately.
#[derive(Debug, Clone)]
pub struct FailingTask {
    name: String,
    error: TaskError,
}

impl FailingTask {
    /// Creates a new failing task.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: TaskError::new(message),
        }
    }

    /// Creates a failing task whose error carries extra data.
    #[must_use]
    pub fn with_data(name: impl Into<String>, message: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            error: TaskError::new(message).with_data(data),
        }
    }
}

#[async_trait]
impl Task for FailingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _args: Args) -> TaskResult {
        Err(self.error.clone())
    }
}

/// A task that yields to the scheduler a fixed number of times before
/// completing.
///
/// Lets tests force a completion order without timers: on a single-threaded
/// runtime a task yielding fewer times finishes first.
#[derive(Debug, Clone)]
pub struct YieldingTask {
    name: String,
    yields: usize,
    outcome: Result<Value, TaskError>,
}

impl YieldingTask {
    /// Creates a task that completes with `value` after `yields` yields.
    #[must_use]
    pub fn new(name: impl Into<String>, yields: usize, value: Value) -> Self {
        Self {
            name: name.into(),
            yields,
            outcome: Ok(value),
        }
    }

    /// Creates a task that fails with `message` after `yields` yields.
    #[must_use]
    pub fn failing(name: impl Into<String>, yields: usize, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            yields,
            outcome: Err(TaskError::new(message)),
        }
    }
}

#[async_trait]
impl Task for YieldingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _args: Args) -> TaskResult {
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        self.outcome.clone().map(|value| vec![value])
    }
}
