//! Composed flows and their calling conventions.

use super::compile::{compile, fold_results, lift_recovery, Unit};
use super::config::FlowConfig;
use crate::description::TaskDescription;
use crate::errors::Failure;
use crate::events::{EventSink, FlowEvent};
use crate::recovery::Recovery;
use crate::tasks::Args;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// The immutable compiled form behind a [`Composed`].
pub(crate) struct Pipeline {
    pub(crate) config: FlowConfig,
    pub(crate) units: Vec<Unit>,
    pub(crate) recovery: Option<Recovery>,
    pub(crate) events: Arc<dyn EventSink>,
    descriptions: Vec<TaskDescription>,
}

impl Pipeline {
    /// Compiles `descriptions` under `config`.
    ///
    /// Recovery descriptions are lifted out; an explicit `recovery` wins over
    /// a lifted one.
    fn assemble(
        config: FlowConfig,
        descriptions: Vec<TaskDescription>,
        recovery: Option<Recovery>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let (descriptions, lifted) = lift_recovery(descriptions);
        let recovery = recovery.or(lifted);
        let units = descriptions
            .iter()
            .map(|d| compile(d, recovery.as_ref(), config.discard))
            .collect();

        Self {
            config,
            units,
            recovery,
            events,
            descriptions,
        }
    }

    pub(crate) fn emit(&self, event: FlowEvent) {
        self.events.try_emit(event);
    }

    pub(crate) fn event(&self, kind: crate::events::EventKind, run_id: Uuid) -> FlowEvent {
        FlowEvent::new(kind, self.config.name.clone(), run_id)
    }
}

/// A composed flow.
///
/// Cloning is cheap and clones share the compiled pipeline. Invocations never
/// share state, so one instance can be invoked concurrently.
#[derive(Clone)]
pub struct Composed {
    inner: Arc<Pipeline>,
}

impl Composed {
    /// Builds a composed flow without validating `config`.
    pub(crate) fn assemble(
        config: FlowConfig,
        descriptions: Vec<TaskDescription>,
        recovery: Option<Recovery>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Pipeline::assemble(config, descriptions, recovery, events)),
        }
    }

    fn rebuild(&self, config: FlowConfig, recovery: Option<Recovery>) -> Self {
        Self::assemble(
            config,
            self.inner.descriptions.clone(),
            recovery,
            Arc::clone(&self.inner.events),
        )
    }

    /// Returns the flow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.inner.config
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.inner.units.len()
    }

    /// Returns the configured recovery unit.
    #[must_use]
    pub fn recovery(&self) -> Option<&Recovery> {
        self.inner.recovery.as_ref()
    }

    /// Returns a new flow with a different transform policy.
    #[must_use]
    pub fn with_transform(&self, transform: bool) -> Self {
        self.rebuild(
            self.inner.config.clone().with_transform(transform),
            self.inner.recovery.clone(),
        )
    }

    /// Returns a new flow with fixed arity tracking toggled.
    #[must_use]
    pub fn with_fixed(&self, fixed: bool) -> Self {
        self.rebuild(
            self.inner.config.clone().with_fixed(fixed),
            self.inner.recovery.clone(),
        )
    }

    /// Returns a new flow with a different recovery unit, or none.
    #[must_use]
    pub fn with_catch(&self, recovery: Option<Recovery>) -> Self {
        self.rebuild(self.inner.config.clone(), recovery)
    }

    /// Returns a new flow reporting to a different event sink.
    #[must_use]
    pub fn with_events(&self, events: Arc<dyn EventSink>) -> Self {
        Self::assemble(
            self.inner.config.clone(),
            self.inner.descriptions.clone(),
            self.inner.recovery.clone(),
            events,
        )
    }

    /// Runs the flow and resolves with its result (future style).
    pub async fn invoke(&self, args: Args) -> Result<Args, Failure> {
        self.inner.run(args).await
    }

    /// Runs the flow on a single argument and folds the results into one
    /// value: `null` for none, the value itself for one, an array otherwise.
    pub async fn invoke_value(&self, value: Value) -> Result<Value, Failure> {
        self.invoke(vec![value]).await.map(fold_results)
    }

    /// Runs the flow on the ambient tokio runtime and hands the outcome to
    /// `callback` exactly once (continuation style).
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn call<F>(&self, args: Args, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Args, Failure>) + Send + 'static,
    {
        let flow = self.clone();
        tokio::spawn(async move {
            callback(flow.invoke(args).await);
        })
    }
}

impl std::fmt::Debug for Composed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composed")
            .field("name", &self.inner.config.name)
            .field("steps", &self.inner.units.len())
            .field("transform", &self.inner.config.transform)
            .field("fixed", &self.inner.config.fixed)
            .field("recovery", &self.inner.recovery.as_ref().map(Recovery::name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TaskError;
    use crate::events::NoOpEventSink;
    use crate::pipeline::{pipeline, series};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn add(n: i64) -> TaskDescription {
        TaskDescription::from_fn(format!("add{n}"), move |args: Args| {
            Ok(vec![json!(args[0].as_i64().unwrap_or_default() + n)])
        })
    }

    #[test]
    fn test_step_count_excludes_recovery() {
        let flow = series(vec![
            add(1),
            TaskDescription::Recovery(Recovery::Swallow),
            add(2),
        ]);

        assert_eq!(flow.step_count(), 2);
        assert!(matches!(flow.recovery(), Some(Recovery::Swallow)));
    }

    #[test]
    fn test_explicit_recovery_beats_lifted() {
        let flow = Composed::assemble(
            FlowConfig::series(),
            vec![TaskDescription::Recovery(Recovery::Swallow)],
            Some(Recovery::from_fn(|_e, args| Ok(args))),
            Arc::new(NoOpEventSink),
        );

        assert!(matches!(flow.recovery(), Some(Recovery::Handler(_))));
    }

    #[tokio::test]
    async fn test_with_methods_return_new_instances() {
        let fixed = series(vec![add(1), add(10)]);
        let transforming = fixed.with_transform(true);

        assert!(!fixed.config().transform);
        assert!(transforming.config().transform);
        assert_eq!(fixed.invoke(vec![json!(0)]).await, Ok(vec![json!(0)]));
        assert_eq!(transforming.invoke(vec![json!(0)]).await, Ok(vec![json!(11)]));
    }

    #[tokio::test]
    async fn test_with_catch_rebuilds_group_recovery() {
        let failing = TaskDescription::sequence(vec![TaskDescription::from_fn(
            "bad",
            |_args: Args| Err(TaskError::new("E")),
        )]);
        let flow = pipeline(vec![failing]);
        assert!(flow.invoke(vec![]).await.is_err());

        let caught = flow.with_catch(Some(Recovery::from_fn(|_e, _a| Ok(vec![json!("ok")]))));
        assert_eq!(caught.invoke(vec![]).await, Ok(vec![json!("ok")]));

        let uncaught = caught.with_catch(None);
        assert!(uncaught.invoke(vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_invoke_value_folds() {
        let flow = pipeline(vec![add(2)]);
        assert_eq!(flow.invoke_value(json!(1)).await, Ok(json!(3)));

        let empty = pipeline(Vec::<TaskDescription>::new());
        assert_eq!(empty.invoke_value(json!("same")).await, Ok(json!("same")));
    }

    #[tokio::test]
    async fn test_call_delivers_once() {
        let flow = pipeline(vec![add(1), add(1)]);
        let (tx, rx) = tokio::sync::oneshot::channel();

        flow.call(vec![json!(1)], move |outcome| {
            let _ = tx.send(outcome);
        })
        .await
        .unwrap();

        assert_eq!(rx.await.unwrap(), Ok(vec![json!(3)]));
    }

    #[test]
    fn test_debug_output() {
        let flow = series(vec![add(1)]);
        let debug = format!("{flow:?}");
        assert!(debug.contains("series"));
        assert!(debug.contains("steps: 1"));
    }
}
