//! Recovery handlers.
//!
//! A recovery handler receives the error of a failed unit together with the
//! arguments that unit was invoked with, and may produce a replacement result
//! that resumes the flow. A handler that fails itself ends the invocation.

use crate::errors::{Failure, TaskError};
use crate::tasks::{Args, TaskResult};
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Trait for recovery handlers.
#[async_trait]
pub trait Recover: Send + Sync + Debug {
    /// Returns the handler name used in logs and events.
    fn name(&self) -> &str {
        "recover"
    }

    /// Produces a replacement result for a failed unit.
    async fn recover(&self, error: &TaskError, upstream: Args) -> TaskResult;
}

/// A synchronous function-based recovery handler.
pub struct FnRecover<F>
where
    F: Fn(&TaskError, Args) -> TaskResult + Send + Sync,
{
    func: F,
}

impl<F> FnRecover<F>
where
    F: Fn(&TaskError, Args) -> TaskResult + Send + Sync,
{
    /// Creates a new function-based handler.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnRecover<F>
where
    F: Fn(&TaskError, Args) -> TaskResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRecover").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Recover for FnRecover<F>
where
    F: Fn(&TaskError, Args) -> TaskResult + Send + Sync,
{
    async fn recover(&self, error: &TaskError, upstream: Args) -> TaskResult {
        (self.func)(error, upstream)
    }
}

/// An async function-based recovery handler.
pub struct AsyncFnRecover<F, Fut>
where
    F: Fn(TaskError, Args) -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnRecover<F, Fut>
where
    F: Fn(TaskError, Args) -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    /// Creates a new async function-based handler.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for AsyncFnRecover<F, Fut>
where
    F: Fn(TaskError, Args) -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnRecover").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Recover for AsyncFnRecover<F, Fut>
where
    F: Fn(TaskError, Args) -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send,
{
    async fn recover(&self, error: &TaskError, upstream: Args) -> TaskResult {
        (self.func)(error.clone(), upstream).await
    }
}

/// A configured recovery unit.
#[derive(Debug, Clone)]
pub enum Recovery {
    /// Delegate to a handler.
    Handler(Arc<dyn Recover>),
    /// Swallow the error and resume with the upstream arguments unchanged.
    Swallow,
}

impl Recovery {
    /// Wraps a handler.
    pub fn handler(handler: impl Recover + 'static) -> Self {
        Self::Handler(Arc::new(handler))
    }

    /// Wraps a synchronous closure.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&TaskError, Args) -> TaskResult + Send + Sync + 'static,
    {
        Self::handler(FnRecover::new(func))
    }

    /// Wraps an async closure.
    pub fn from_async<F, Fut>(func: F) -> Self
    where
        F: Fn(TaskError, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self::handler(AsyncFnRecover::new(func))
    }

    /// Maps the boolean sentinel: `true` swallows errors, `false` means no
    /// recovery.
    #[must_use]
    pub fn from_flag(enabled: bool) -> Option<Self> {
        enabled.then_some(Self::Swallow)
    }

    /// Returns the handler name used in logs and events.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Handler(handler) => handler.name(),
            Self::Swallow => "swallow",
        }
    }

    /// Runs recovery for `failure`.
    ///
    /// A handler error comes back as a fatal [`Failure`] carrying the same
    /// upstream arguments.
    pub async fn run(&self, failure: &Failure) -> Result<Args, Failure> {
        match self {
            Self::Swallow => Ok(failure.upstream.clone()),
            Self::Handler(handler) => handler
                .recover(&failure.error, failure.upstream.clone())
                .await
                .map_err(|err| Failure::fatal(err, failure.upstream.clone())),
        }
    }
}
