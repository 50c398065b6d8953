//! Error types for the taskweave engine.
//!
//! Three layers exist:
//!
//! - [`TaskError`] is the error value a single task reports.
//! - [`Failure`] is the envelope the engine moves around while deciding
//!   whether a failure can be recovered: the error, the arguments that were
//!   in flight, and the flag that stops a failed recovery from being
//!   recovered again.
//! - [`FlowError`] is the crate-level error for everything outside a run
//!   (configuration, serialization) and for surfacing a failed run.

use crate::tasks::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The main error type for taskweave operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The flow configuration was rejected.
    #[error("{0}")]
    Validation(#[from] ConfigError),

    /// An invocation finished with an unrecovered failure.
    #[error("{0}")]
    Task(#[from] Failure),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Error raised when a flow configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid flow configuration: {message}")]
pub struct ConfigError {
    /// The error message.
    pub message: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The error value reported by a task.
///
/// `data` carries an optional structured payload so recovery handlers can
/// branch on more than the message.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TaskError {
    /// Human-readable message.
    pub message: String,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TaskError {
    /// Creates a new task error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    /// Attaches a structured payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Error for a callback-style task whose completion was dropped unsettled.
    #[must_use]
    pub fn completion_dropped(task: &str) -> Self {
        Self::new(format!(
            "Task '{task}' dropped its completion without settling it"
        ))
    }

    /// JSON form handed to error middleware as its leading argument.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(ref data) = self.data {
            map.insert("data".to_string(), data.clone());
        }
        Value::Object(map)
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Serialization error: {err}"))
    }
}

/// A failure travelling through the engine.
///
/// `upstream` is the argument vector the failing unit was invoked with.
/// `skip_recovery` is set once a recovery handler has itself failed; such a
/// failure is fatal and is never routed into recovery again.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct Failure {
    /// The error value.
    pub error: TaskError,
    /// Arguments in flight when the failure happened.
    pub upstream: Args,
    /// Set when this failure came out of a recovery handler.
    pub skip_recovery: bool,
}

impl Failure {
    /// Creates a recoverable failure.
    #[must_use]
    pub fn new(error: TaskError, upstream: Args) -> Self {
        Self {
            error,
            upstream,
            skip_recovery: false,
        }
    }

    /// Creates a fatal failure raised by a recovery handler.
    #[must_use]
    pub fn fatal(error: TaskError, upstream: Args) -> Self {
        Self {
            error,
            upstream,
            skip_recovery: true,
        }
    }

    /// Returns the error value.
    #[must_use]
    pub fn error(&self) -> &TaskError {
        &self.error
    }

    /// Returns the arguments that were in flight.
    #[must_use]
    pub fn upstream(&self) -> &[Value] {
        &self.upstream
    }

    /// Returns true if recovery may still be attempted.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !self.skip_recovery
    }

    /// Arguments for an error middleware: the error value followed by the
    /// upstream arguments.
    #[must_use]
    pub fn middleware_args(&self) -> Args {
        let mut args = Vec::with_capacity(self.upstream.len() + 1);
        args.push(self.error.to_value());
        args.extend(self.upstream.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_error_creation() {
        let err = TaskError::new("boom").with_data(json!({"code": 7}));

        assert_eq!(err.message, "boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.data, Some(json!({"code": 7})));
    }

    #[test]
    fn test_task_error_to_value() {
        let plain = TaskError::new("boom");
        assert_eq!(plain.to_value(), json!({"message": "boom"}));

        let rich = TaskError::new("boom").with_data(json!([1, 2]));
        assert_eq!(rich.to_value(), json!({"message": "boom", "data": [1, 2]}));
    }

    #[test]
    fn test_task_error_from_anyhow() {
        let err: TaskError = anyhow::anyhow!("disk full").context("writing cache").into();
        assert_eq!(err.message, "writing cache: disk full");
    }

    #[test]
    fn test_failure_flags() {
        let failure = Failure::new(TaskError::new("x"), vec![json!(1)]);
        assert!(failure.is_recoverable());

        let fatal = Failure::fatal(TaskError::new("y"), vec![]);
        assert!(!fatal.is_recoverable());
        assert_eq!(fatal.to_string(), "y");
    }

    #[test]
    fn test_failure_middleware_args() {
        let failure = Failure::new(TaskError::new("bad"), vec![json!(3), json!("a")]);
        assert_eq!(
            failure.middleware_args(),
            vec![json!({"message": "bad"}), json!(3), json!("a")]
        );
    }

    #[test]
    fn test_flow_error_wraps_failure() {
        let err: FlowError = Failure::new(TaskError::new("late"), vec![]).into();
        assert_eq!(err.to_string(), "late");

        let cfg: FlowError = ConfigError::new("empty name").into();
        assert_eq!(cfg.to_string(), "Invalid flow configuration: empty name");
    }
}
