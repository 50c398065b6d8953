//! Flow configuration record.

use crate::errors::{ConfigError, FlowError};
use serde::{Deserialize, Serialize};

/// What happens to fan-out siblings still running when another member fails.
///
/// Their results never reach the output either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardPolicy {
    /// Let them run to completion in the background and ignore the output.
    ///
    /// The siblings are spawned onto the ambient tokio runtime. On a
    /// multi-thread runtime they may run on another worker, in parallel
    /// with the rest of the flow; use a current-thread runtime to keep
    /// every task on one event loop. Without a runtime they are dropped.
    #[default]
    Drain,
    /// Drop their futures, cancelling them at their next suspension point.
    Drop,
}

/// Configuration for a composed flow.
///
/// Fixed once the flow is built; use the `with_*` methods on
/// [`Composed`](super::Composed) to derive a differently configured flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Flow name used in logs and events.
    pub name: String,
    /// Feed each step's result to the next step instead of the original
    /// invocation arguments.
    pub transform: bool,
    /// Track the invocation's argument count and treat tasks declaring more
    /// parameters than that as error middleware.
    pub fixed: bool,
    /// Fate of fan-out siblings after a failure.
    pub discard: DiscardPolicy,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::series()
    }
}

impl FlowConfig {
    /// Series defaults: fixed arguments, no transform.
    #[must_use]
    pub fn series() -> Self {
        Self {
            name: "series".to_string(),
            transform: false,
            fixed: true,
            discard: DiscardPolicy::Drain,
        }
    }

    /// Pipeline defaults: each step transforms the previous result.
    #[must_use]
    pub fn pipeline() -> Self {
        Self {
            name: "pipeline".to_string(),
            transform: true,
            fixed: false,
            discard: DiscardPolicy::Drain,
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result is invalid.
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the transform policy.
    #[must_use]
    pub fn with_transform(mut self, transform: bool) -> Self {
        self.transform = transform;
        self
    }

    /// Sets fixed arity tracking.
    #[must_use]
    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Sets the discard policy.
    #[must_use]
    pub fn with_discard(mut self, discard: DiscardPolicy) -> Self {
        self.discard = discard;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or whitespace-only.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::new(
                "Flow name cannot be empty or whitespace-only",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_presets() {
        let series = FlowConfig::series();
        assert!(series.fixed);
        assert!(!series.transform);

        let pipeline = FlowConfig::pipeline();
        assert!(pipeline.transform);
        assert!(!pipeline.fixed);

        assert_eq!(FlowConfig::default(), series);
    }

    #[test]
    fn test_builder_methods() {
        let config = FlowConfig::series()
            .with_name("checkout")
            .with_transform(true)
            .with_fixed(false)
            .with_discard(DiscardPolicy::Drop);

        assert_eq!(config.name, "checkout");
        assert!(config.transform);
        assert!(!config.fixed);
        assert_eq!(config.discard, DiscardPolicy::Drop);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(FlowConfig::series().with_name("").validate().is_err());
        assert!(FlowConfig::series().with_name("   ").validate().is_err());
        assert!(FlowConfig::series().validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = FlowConfig::from_json(r#"{"name": "etl", "transform": true}"#).unwrap();

        assert_eq!(
            config,
            FlowConfig {
                name: "etl".to_string(),
                transform: true,
                fixed: true,
                discard: DiscardPolicy::Drain,
            }
        );
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            FlowConfig::from_json(r#"{"name": ""}"#),
            Err(FlowError::Validation(_))
        ));
        assert!(matches!(
            FlowConfig::from_json("{not json"),
            Err(FlowError::Serialization(_))
        ));
        assert!(matches!(
            FlowConfig::from_json(r#"{"discard": "explode"}"#),
            Err(FlowError::Serialization(_))
        ));
    }
}
