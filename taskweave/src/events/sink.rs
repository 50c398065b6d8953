//! Flow events and the sinks that receive them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, Level};
use uuid::Uuid;

/// Lifecycle points reported by a running flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// An invocation began.
    #[serde(rename = "flow.started")]
    FlowStarted,
    /// A step began.
    #[serde(rename = "step.started")]
    StepStarted,
    /// A step succeeded.
    #[serde(rename = "step.completed")]
    StepCompleted,
    /// A step failed.
    #[serde(rename = "step.failed")]
    StepFailed,
    /// Error middleware was passed over during normal flow.
    #[serde(rename = "step.skipped")]
    StepSkipped,
    /// A recovery handler or error middleware was invoked.
    #[serde(rename = "recovery.invoked")]
    RecoveryInvoked,
    /// Recovery produced a replacement result.
    #[serde(rename = "recovery.succeeded")]
    RecoverySucceeded,
    /// Recovery failed.
    #[serde(rename = "recovery.failed")]
    RecoveryFailed,
    /// The invocation finished successfully.
    #[serde(rename = "flow.completed")]
    FlowCompleted,
    /// The invocation finished with a failure.
    #[serde(rename = "flow.failed")]
    FlowFailed,
}

impl EventKind {
    /// Returns the dotted event name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FlowStarted => "flow.started",
            Self::StepStarted => "step.started",
            Self::StepCompleted => "step.completed",
            Self::StepFailed => "step.failed",
            Self::StepSkipped => "step.skipped",
            Self::RecoveryInvoked => "recovery.invoked",
            Self::RecoverySucceeded => "recovery.succeeded",
            Self::RecoveryFailed => "recovery.failed",
            Self::FlowCompleted => "flow.completed",
            Self::FlowFailed => "flow.failed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single event emitted during an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEvent {
    /// What happened.
    pub kind: EventKind,
    /// Name of the emitting flow.
    pub flow: String,
    /// Identifies the invocation.
    pub run_id: Uuid,
    /// Step index, for step and recovery events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    /// Unit or handler name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Error message, for failure events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl FlowEvent {
    /// Creates a new event stamped with the current time.
    #[must_use]
    pub fn new(kind: EventKind, flow: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            kind,
            flow: flow.into(),
            run_id,
            step: None,
            unit: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the step index and unit name.
    #[must_use]
    pub fn with_step(mut self, step: usize, unit: impl Into<String>) -> Self {
        self.step = Some(step);
        self.unit = Some(unit.into());
        self
    }

    /// Sets the unit name only.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Trait for event sinks that can receive flow events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: FlowEvent);

    /// Emits an event without blocking.
    ///
    /// Must never panic; the runner calls this on its hot path.
    fn try_emit(&self, event: FlowEvent);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: FlowEvent) {}

    fn try_emit(&self, _event: FlowEvent) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &FlowEvent) {
        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.kind,
                flow = %event.flow,
                run_id = %event.run_id,
                step = ?event.step,
                unit = ?event.unit,
                error = ?event.error,
                "Event: {}", event.kind
            );
        } else {
            info!(
                event_type = %event.kind,
                flow = %event.flow,
                run_id = %event.run_id,
                step = ?event.step,
                unit = ?event.unit,
                error = ?event.error,
                "Event: {}", event.kind
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: FlowEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: FlowEvent) {
        self.log_event(&event);
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<FlowEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.read().clone()
    }

    /// Returns the kinds of all collected events, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.read().iter().map(|e| e.kind).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose dotted name starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<FlowEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind.as_str().starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: FlowEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: FlowEvent) {
        self.events.write().push(event);
    }
}
