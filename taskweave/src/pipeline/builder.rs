//! Flow builder with validation.

use super::composed::Composed;
use super::config::{DiscardPolicy, FlowConfig};
use crate::description::TaskDescription;
use crate::errors::FlowError;
use crate::events::{get_event_sink, EventSink};
use crate::recovery::Recovery;
use std::sync::Arc;

/// Builder for composed flows.
#[derive(Clone)]
pub struct FlowBuilder {
    config: FlowConfig,
    steps: Vec<TaskDescription>,
    recovery: Option<Recovery>,
    events: Option<Arc<dyn EventSink>>,
}

impl FlowBuilder {
    /// Creates a builder with the series defaults under the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(FlowConfig::series().with_name(name))
    }

    /// Creates a builder from an existing configuration.
    #[must_use]
    pub fn from_config(config: FlowConfig) -> Self {
        Self {
            config,
            steps: Vec::new(),
            recovery: None,
            events: None,
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, description: impl Into<TaskDescription>) -> Self {
        self.steps.push(description.into());
        self
    }

    /// Appends several steps.
    #[must_use]
    pub fn steps<I, D>(mut self, descriptions: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<TaskDescription>,
    {
        self.steps.extend(descriptions.into_iter().map(Into::into));
        self
    }

    /// Feeds each step the previous step's output.
    #[must_use]
    pub fn transform(mut self, transform: bool) -> Self {
        self.config.transform = transform;
        self
    }

    /// Enables arity-based error middleware.
    #[must_use]
    pub fn fixed(mut self, fixed: bool) -> Self {
        self.config.fixed = fixed;
        self
    }

    /// Sets what happens to fan-out siblings still running after a failure.
    #[must_use]
    pub fn discard(mut self, discard: DiscardPolicy) -> Self {
        self.config.discard = discard;
        self
    }

    /// Sets the recovery handler.
    ///
    /// Takes precedence over recovery descriptions passed as steps.
    #[must_use]
    pub fn catch(mut self, recovery: Recovery) -> Self {
        self.recovery = Some(recovery);
        self
    }

    /// Swallows failures, resuming with the failing step's arguments.
    /// `false` clears any recovery set so far.
    #[must_use]
    pub fn swallow(mut self, enabled: bool) -> Self {
        self.recovery = Recovery::from_flag(enabled);
        self
    }

    /// Reports lifecycle events to `sink` instead of the global sink.
    #[must_use]
    pub fn events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Returns the flow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the number of descriptions added so far.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Compiles the flow.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Validation`] if the configuration is invalid.
    pub fn build(self) -> Result<Composed, FlowError> {
        self.config.validate()?;
        let events = self.events.unwrap_or_else(get_event_sink);
        Ok(Composed::assemble(self.config, self.steps, self.recovery, events))
    }
}

impl std::fmt::Debug for FlowBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowBuilder")
            .field("config", &self.config)
            .field("steps", &self.steps.len())
            .field("recovery", &self.recovery.as_ref().map(Recovery::name))
            .finish_non_exhaustive()
    }
}

/// Composes descriptions with the default settings: every step receives
/// the invocation arguments and error middleware is active.
pub fn series<I, D>(descriptions: I) -> Composed
where
    I: IntoIterator<Item = D>,
    D: Into<TaskDescription>,
{
    assemble(FlowConfig::series(), descriptions)
}

/// Composes descriptions so that each step receives the previous step's
/// output.
pub fn pipeline<I, D>(descriptions: I) -> Composed
where
    I: IntoIterator<Item = D>,
    D: Into<TaskDescription>,
{
    assemble(FlowConfig::pipeline(), descriptions)
}

fn assemble<I, D>(config: FlowConfig, descriptions: I) -> Composed
where
    I: IntoIterator<Item = D>,
    D: Into<TaskDescription>,
{
    let steps = descriptions.into_iter().map(Into::into).collect();
    Composed::assemble(config, steps, None, get_event_sink())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::tasks::Args;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn inc() -> TaskDescription {
        TaskDescription::from_fn("inc", |args: Args| {
            Ok(vec![json!(args[0].as_i64().unwrap_or_default() + 1)])
        })
    }

    #[test]
    fn test_builder_creation() {
        let builder = FlowBuilder::new("test");
        assert_eq!(builder.name(), "test");
        assert_eq!(builder.step_count(), 0);
    }

    #[test]
    fn test_builder_collects_steps() {
        let builder = FlowBuilder::new("test").step(inc()).steps(vec![inc(), inc()]);
        assert_eq!(builder.step_count(), 3);
    }

    #[test]
    fn test_builder_rejects_blank_name() {
        let result = FlowBuilder::new("  ").step(inc()).build();
        assert!(matches!(result, Err(FlowError::Validation(_))));
    }

    #[test]
    fn test_builder_applies_settings() {
        let flow = FlowBuilder::new("settings")
            .transform(true)
            .fixed(false)
            .discard(DiscardPolicy::Drop)
            .swallow(true)
            .build()
            .unwrap();

        assert!(flow.config().transform);
        assert!(!flow.config().fixed);
        assert_eq!(flow.config().discard, DiscardPolicy::Drop);
        assert!(matches!(flow.recovery(), Some(Recovery::Swallow)));
    }

    #[test]
    fn test_swallow_false_clears_catch() {
        let flow = FlowBuilder::new("cleared")
            .catch(Recovery::from_fn(|_e, args| Ok(args)))
            .swallow(false)
            .build()
            .unwrap();

        assert!(flow.recovery().is_none());
    }

    #[tokio::test]
    async fn test_builder_routes_events_to_sink() {
        let sink = Arc::new(CollectingEventSink::new());
        let flow = FlowBuilder::new("evented")
            .transform(true)
            .steps([inc(), inc()])
            .events(sink.clone())
            .build()
            .unwrap();

        assert_eq!(flow.invoke(vec![json!(0)]).await, Ok(vec![json!(2)]));
        assert!(sink.events().iter().all(|e| e.flow == "evented"));
        assert_eq!(sink.events_of_type("step.completed").len(), 2);
    }

    #[test]
    fn test_entry_point_defaults() {
        let s = series(vec![inc()]);
        assert_eq!(s.name(), "series");
        assert!(s.config().fixed);
        assert!(!s.config().transform);

        let p = pipeline(vec![inc()]);
        assert_eq!(p.name(), "pipeline");
        assert!(!p.config().fixed);
        assert!(p.config().transform);
    }

    #[test]
    fn test_from_config() {
        let config = FlowConfig::from_json(r#"{"name": "loaded", "transform": true}"#).unwrap();
        let builder = FlowBuilder::from_config(config);
        assert_eq!(builder.name(), "loaded");
        assert!(builder.build().unwrap().config().transform);
    }
}
