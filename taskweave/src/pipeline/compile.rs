//! Compiles task descriptions into executable units.
//!
//! Every shape ends up as a [`Unit`]: something that takes an argument
//! vector and resolves once, to a result vector or a [`Failure`]. Units are
//! immutable after compilation and cheap to clone, so one compiled flow can
//! serve any number of concurrent invocations.

use super::config::DiscardPolicy;
use super::fanout;
use super::Composed;
use crate::description::TaskDescription;
use crate::errors::Failure;
use crate::recovery::Recovery;
use crate::tasks::{Args, Task};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::sync::Arc;

/// A compiled, executable unit.
#[derive(Debug, Clone)]
pub(crate) struct Unit {
    kind: Arc<UnitKind>,
}

#[derive(Debug)]
enum UnitKind {
    Leaf(Arc<dyn Task>),
    Group(Group),
    Nested(Composed),
    Identity,
}

/// A fan-out group: members plus the layout their results are placed in.
#[derive(Debug)]
pub(crate) struct Group {
    pub(crate) layout: Layout,
    pub(crate) members: Vec<Unit>,
    pub(crate) recovery: Option<Recovery>,
    pub(crate) discard: DiscardPolicy,
}

/// Result placement for a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Layout {
    /// One key per member, in member order.
    Keyed(Vec<String>),
    /// Positional.
    Indexed,
}

impl Layout {
    /// Assembles member results into the group's container.
    pub(crate) fn assemble(&self, slots: Vec<Option<Value>>) -> Value {
        let values = slots.into_iter().map(Option::unwrap_or_default);
        match self {
            Self::Keyed(keys) => Value::Object(keys.iter().cloned().zip(values).collect()),
            Self::Indexed => Value::Array(values.collect()),
        }
    }

    /// Label used in logs.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Keyed(_) => "mapping",
            Self::Indexed => "sequence",
        }
    }
}

impl Unit {
    fn new(kind: UnitKind) -> Self {
        Self {
            kind: Arc::new(kind),
        }
    }

    /// A unit that completes with its arguments unchanged.
    pub(crate) fn identity() -> Self {
        Self::new(UnitKind::Identity)
    }

    /// Declared parameter count; only single tasks declare one.
    pub(crate) fn arity(&self) -> Option<usize> {
        match self.kind.as_ref() {
            UnitKind::Leaf(task) => task.arity(),
            _ => None,
        }
    }

    /// True if this unit declares more parameters than `threshold`.
    pub(crate) fn is_error_middleware(&self, threshold: usize) -> bool {
        self.arity().is_some_and(|arity| arity > threshold)
    }

    /// Name used in logs and events.
    pub(crate) fn name(&self) -> &str {
        match self.kind.as_ref() {
            UnitKind::Leaf(task) => task.name(),
            UnitKind::Group(group) => group.layout.label(),
            UnitKind::Nested(composed) => composed.name(),
            UnitKind::Identity => "identity",
        }
    }

    /// Runs the unit.
    ///
    /// The returned future owns everything it needs, so it can outlive the
    /// caller when a fan-out group drains abandoned siblings.
    pub(crate) fn run(&self, args: Args) -> BoxFuture<'static, Result<Args, Failure>> {
        let unit = self.clone();
        async move {
            match unit.kind.as_ref() {
                UnitKind::Leaf(task) => task
                    .run(args.clone())
                    .await
                    .map_err(|error| Failure::new(error, args)),
                UnitKind::Group(group) => fanout::resolve(group, args).await,
                UnitKind::Nested(composed) => {
                    composed.invoke(args.clone()).await.map_err(|failure| Failure {
                        error: failure.error,
                        upstream: args,
                        skip_recovery: failure.skip_recovery,
                    })
                }
                UnitKind::Identity => Ok(args),
            }
        }
        .boxed()
    }
}

/// Folds a result vector into the single value a fan-out slot holds.
pub(crate) fn fold_results(mut results: Args) -> Value {
    match results.len() {
        0 => Value::Null,
        1 => results.pop().unwrap_or_default(),
        _ => Value::Array(results),
    }
}

/// Splits recovery descriptions out of a list.
///
/// Returns the remaining descriptions in order and the last recovery seen.
pub(crate) fn lift_recovery(
    descriptions: impl IntoIterator<Item = TaskDescription>,
) -> (Vec<TaskDescription>, Option<Recovery>) {
    let mut steps = Vec::new();
    let mut recovery = None;
    for description in descriptions {
        match description {
            TaskDescription::Recovery(r) => recovery = Some(r),
            other => steps.push(other),
        }
    }
    (steps, recovery)
}

/// Compiles one description.
///
/// `recovery` is the handler inherited from the enclosing flow; fan-out
/// groups route member failures to it.
pub(crate) fn compile(
    description: &TaskDescription,
    recovery: Option<&Recovery>,
    discard: DiscardPolicy,
) -> Unit {
    match description {
        TaskDescription::Callable(task) => Unit::new(UnitKind::Leaf(Arc::clone(task))),
        TaskDescription::Mapping(entries) => {
            let (keys, members): (Vec<String>, Vec<TaskDescription>) = entries
                .iter()
                .filter(|(_, member)| !member.is_recovery())
                .map(|(key, member)| (key.clone(), member.clone()))
                .unzip();
            let local = entries.values().filter_map(as_recovery).last();
            compile_group(Layout::Keyed(keys), &members, local.or(recovery), discard)
        }
        TaskDescription::Sequence(items) => {
            let (members, local) = lift_recovery(items.iter().cloned());
            compile_group(Layout::Indexed, &members, local.as_ref().or(recovery), discard)
        }
        TaskDescription::Composed(composed) => Unit::new(UnitKind::Nested(composed.clone())),
        TaskDescription::Recovery(_) => {
            tracing::debug!("Recovery description compiled in step position; using identity");
            Unit::identity()
        }
        TaskDescription::Opaque(value) => {
            tracing::debug!(value = %value, "Unrecognised task description; using identity");
            Unit::identity()
        }
    }
}

fn as_recovery(description: &TaskDescription) -> Option<&Recovery> {
    match description {
        TaskDescription::Recovery(recovery) => Some(recovery),
        _ => None,
    }
}

fn compile_group(
    layout: Layout,
    members: &[TaskDescription],
    recovery: Option<&Recovery>,
    discard: DiscardPolicy,
) -> Unit {
    let members = members
        .iter()
        .map(|member| compile(member, recovery, discard))
        .collect();
    Unit::new(UnitKind::Group(Group {
        layout,
        members,
        recovery: recovery.cloned(),
        discard,
    }))
}
