//! Observability utilities.
//!
//! Flows log through `tracing`; this module installs a subscriber for
//! binaries and tests that want to see those records, and times runs.

mod subscriber;
mod timer;

pub use subscriber::{build_subscriber, init_tracing, LogFormat, LoggingConfig, LOG_ENV_VAR};
pub use timer::SpanTimer;
