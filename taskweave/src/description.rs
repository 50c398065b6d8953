//! Task descriptions and their classification.
//!
//! A [`TaskDescription`] is what callers hand to the composition entry
//! points. It is a closed set of shapes; [`classify`] reports which one a
//! description has and the compiler branches on it exhaustively.

use crate::errors::TaskError;
use crate::pipeline::Composed;
use crate::recovery::Recovery;
use crate::tasks::{Args, AsyncFnTask, CallbackTask, Completion, FnTask, Task, TaskResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Caller-supplied description of work.
#[derive(Debug, Clone)]
pub enum TaskDescription {
    /// A single task.
    Callable(Arc<dyn Task>),
    /// Keyed members run concurrently; results land under the same keys.
    /// Members start in insertion order.
    Mapping(IndexMap<String, TaskDescription>),
    /// Ordered members run concurrently; results land at the same positions.
    Sequence(Vec<TaskDescription>),
    /// A flow built earlier, used as a single step.
    Composed(Composed),
    /// A recovery handler; configuration rather than work.
    Recovery(Recovery),
    /// Anything unrecognised. Compiles to an identity unit.
    Opaque(Value),
}

/// The shape reported by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// A single task.
    Callable,
    /// A keyed fan-out group.
    Mapping,
    /// An ordered fan-out group.
    Sequence,
    /// A previously composed flow.
    ComposedInstance,
    /// A recovery handler.
    Recovery,
    /// An unrecognised value.
    Opaque,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callable => write!(f, "callable"),
            Self::Mapping => write!(f, "mapping"),
            Self::Sequence => write!(f, "sequence"),
            Self::ComposedInstance => write!(f, "composed"),
            Self::Recovery => write!(f, "recovery"),
            Self::Opaque => write!(f, "opaque"),
        }
    }
}

/// Reports the shape of a description.
#[must_use]
pub fn classify(description: &TaskDescription) -> Shape {
    match description {
        TaskDescription::Callable(_) => Shape::Callable,
        TaskDescription::Mapping(_) => Shape::Mapping,
        TaskDescription::Sequence(_) => Shape::Sequence,
        TaskDescription::Composed(_) => Shape::ComposedInstance,
        TaskDescription::Recovery(_) => Shape::Recovery,
        TaskDescription::Opaque(_) => Shape::Opaque,
    }
}

impl TaskDescription {
    /// Returns the shape of this description.
    #[must_use]
    pub fn shape(&self) -> Shape {
        classify(self)
    }

    /// Wraps a task.
    pub fn task(task: impl Task + 'static) -> Self {
        Self::Callable(Arc::new(task))
    }

    /// Wraps a synchronous closure.
    pub fn from_fn<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Args) -> TaskResult + Send + Sync + 'static,
    {
        Self::task(FnTask::new(name, func))
    }

    /// Wraps an async closure.
    pub fn from_async<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self::task(AsyncFnTask::new(name, func))
    }

    /// Wraps a continuation-style closure.
    pub fn from_callback<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Args, Completion) + Send + Sync + 'static,
    {
        Self::task(CallbackTask::new(name, func))
    }

    /// Builds a keyed group. A repeated key keeps its first position and
    /// the last description.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TaskDescription)>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds an ordered group.
    pub fn sequence(members: impl IntoIterator<Item = TaskDescription>) -> Self {
        Self::Sequence(members.into_iter().collect())
    }

    /// Builds a recovery description from a synchronous closure.
    pub fn recover<F>(func: F) -> Self
    where
        F: Fn(&TaskError, Args) -> TaskResult + Send + Sync + 'static,
    {
        Self::Recovery(Recovery::from_fn(func))
    }

    /// Returns true for recovery descriptions.
    #[must_use]
    pub fn is_recovery(&self) -> bool {
        matches!(self, Self::Recovery(_))
    }
}

impl From<Arc<dyn Task>> for TaskDescription {
    fn from(task: Arc<dyn Task>) -> Self {
        Self::Callable(task)
    }
}

impl From<Composed> for TaskDescription {
    fn from(composed: Composed) -> Self {
        Self::Composed(composed)
    }
}

impl From<Recovery> for TaskDescription {
    fn from(recovery: Recovery) -> Self {
        Self::Recovery(recovery)
    }
}

impl From<Vec<TaskDescription>> for TaskDescription {
    fn from(members: Vec<TaskDescription>) -> Self {
        Self::Sequence(members)
    }
}

impl From<IndexMap<String, TaskDescription>> for TaskDescription {
    fn from(entries: IndexMap<String, TaskDescription>) -> Self {
        Self::Mapping(entries)
    }
}

impl From<BTreeMap<String, TaskDescription>> for TaskDescription {
    fn from(entries: BTreeMap<String, TaskDescription>) -> Self {
        Self::Mapping(entries.into_iter().collect())
    }
}

/// Raw JSON: arrays become sequences, objects become mappings, and every
/// other value is opaque.
impl From<Value> for TaskDescription {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
            other => Self::Opaque(other),
        }
    }
}
