//! Task trait and adapters.
//!
//! A task is anything that, given an argument vector, eventually produces a
//! single completion: a result vector or a [`TaskError`]. The adapters below
//! cover the three ways such work is usually written:
//!
//! - [`FnTask`] for plain synchronous closures,
//! - [`AsyncFnTask`] for closures returning a future,
//! - [`CallbackTask`] for closures that settle a [`Completion`] handle,
//!   possibly from another task or a timer.

use crate::errors::TaskError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use tokio::sync::oneshot;

/// Argument and result vector passed between tasks.
pub type Args = Vec<Value>;

/// Outcome of running a single task.
pub type TaskResult = Result<Args, TaskError>;

/// Trait for composable tasks.
#[async_trait]
pub trait Task: Send + Sync + Debug {
    /// Returns the name of the task.
    fn name(&self) -> &str;

    /// Declared parameter count.
    ///
    /// Only consulted by flows with fixed arity tracking: a task declaring
    /// more parameters than the invocation supplies is treated as error
    /// middleware. `None` means undeclared.
    fn arity(&self) -> Option<usize> {
        None
    }

    /// Runs the task.
    async fn run(&self, args: Args) -> TaskResult;
}

/// A synchronous function-based task.
pub struct FnTask<F>
where
    F: Fn(Args) -> TaskResult + Send + Sync,
{
    name: String,
    arity: Option<usize>,
    func: F,
}

impl<F> FnTask<F>
where
    F: Fn(Args) -> TaskResult + Send + Sync,
{
    /// Creates a new function-based task.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            arity: None,
            func,
        }
    }

    /// Declares the parameter count.
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }
}

impl<F> Debug for FnTask<F>
where
    F: Fn(Args) -> TaskResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTask")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[async_trait]
impl<F> Task for FnTask<F>
where
    F: Fn(Args) -> TaskResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Option<usize> {
        self.arity
    }

    async fn run(&self, args: Args) -> TaskResult {
        (self.func)(args)
    }
}

/// An async function-based task.
pub struct AsyncFnTask<F, Fut>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    name: String,
    arity: Option<usize>,
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnTask<F, Fut>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    /// Creates a new async function-based task.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            arity: None,
            func,
            _phantom: PhantomData,
        }
    }

    /// Declares the parameter count.
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }
}

impl<F, Fut> Debug for AsyncFnTask<F, Fut>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnTask")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Task for AsyncFnTask<F, Fut>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Option<usize> {
        self.arity
    }

    async fn run(&self, args: Args) -> TaskResult {
        (self.func)(args).await
    }
}

/// Single-use completion handle given to a [`CallbackTask`].
///
/// Settling consumes the handle, so a task can complete at most once.
/// Dropping it unsettled fails the task.
#[derive(Debug)]
pub struct Completion {
    sender: oneshot::Sender<TaskResult>,
}

impl Completion {
    /// Settles the task with a result or an error.
    pub fn settle(self, result: TaskResult) {
        if self.sender.send(result).is_err() {
            tracing::debug!("Completion settled after its task was abandoned");
        }
    }

    /// Completes the task successfully.
    pub fn ok(self, args: Args) {
        self.settle(Ok(args));
    }

    /// Fails the task.
    pub fn fail(self, error: impl Into<TaskError>) {
        self.settle(Err(error.into()));
    }
}

/// A continuation-style task: the closure receives the arguments and a
/// [`Completion`] it must eventually settle.
pub struct CallbackTask<F>
where
    F: Fn(Args, Completion) + Send + Sync,
{
    name: String,
    arity: Option<usize>,
    func: F,
}

impl<F> CallbackTask<F>
where
    F: Fn(Args, Completion) + Send + Sync,
{
    /// Creates a new callback-style task.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            arity: None,
            func,
        }
    }

    /// Declares the parameter count.
    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }
}

impl<F> Debug for CallbackTask<F>
where
    F: Fn(Args, Completion) + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTask")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[async_trait]
impl<F> Task for CallbackTask<F>
where
    F: Fn(Args, Completion) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Option<usize> {
        self.arity
    }

    async fn run(&self, args: Args) -> TaskResult {
        let (sender, receiver) = oneshot::channel();
        (self.func)(args, Completion { sender });
        receiver
            .await
            .unwrap_or_else(|_| Err(TaskError::completion_dropped(&self.name)))
    }
}

/// A task that completes with its arguments unchanged.
#[derive(Debug, Clone)]
pub struct IdentityTask {
    name: String,
}

impl IdentityTask {
    /// Creates a new identity task.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Task for IdentityTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, args: Args) -> TaskResult {
        Ok(args)
    }
}

/// A task that completes with no results.
#[derive(Debug, Clone)]
pub struct NoOpTask {
    name: String,
}

impl NoOpTask {
    /// Creates a new no-op task.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Task for NoOpTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _args: Args) -> TaskResult {
        Ok(Vec::new())
    }
}
