//! Event sink system for observability.
//!
//! Flows report lifecycle events to an [`EventSink`]. A flow built without
//! an explicit sink picks up the process-wide sink installed with
//! [`set_event_sink`], falling back to [`NoOpEventSink`].

mod sink;

pub use sink::{
    CollectingEventSink, EventKind, EventSink, FlowEvent, LoggingEventSink, NoOpEventSink,
};

use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the current global event sink.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_EVENT_SINK.write() = Some(sink);
}

/// Clears the current global event sink.
pub fn clear_event_sink() {
    *GLOBAL_EVENT_SINK.write() = None;
}

/// Gets the current global event sink.
///
/// Returns a `NoOpEventSink` if no sink is set.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}
