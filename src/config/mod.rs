//! # Reconciler Configuration
//!
//! Layered configuration for the reconciler process.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults ([`ReconcilerConfig::default`])
//! 2. `harbor.yaml` in the configuration directory
//! 3. `harbor.<environment>.yaml` in the configuration directory
//! 4. `HARBOR__<SECTION>__<KEY>` environment variables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use harbor_reconciler::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let batch_size = manager.config().queue.batch_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{output, queues, system};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring harbor.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub queue: QueueConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue the platform enqueues its own follow-up work on
    pub internal_queue_name: String,
    /// Queue external actors enqueue intents on
    pub public_queue_name: String,
    pub visibility_timeout_seconds: u64,
    pub polling_interval_ms: u64,
    /// Max deliveries taken from one queue per poll
    pub batch_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            internal_queue_name: queues::INTERNAL_QUEUE_NAME.to_string(),
            public_queue_name: queues::PUBLIC_QUEUE_NAME.to_string(),
            visibility_timeout_seconds: system::DEFAULT_VISIBILITY_TIMEOUT_SECONDS,
            polling_interval_ms: system::DEFAULT_POLLING_INTERVAL_MS,
            batch_size: system::DEFAULT_BATCH_SIZE,
        }
    }
}

impl QueueConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Queues the consumer drains, internal first
    pub fn queue_names(&self) -> Vec<String> {
        vec![
            self.internal_queue_name.clone(),
            self.public_queue_name.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub async_buffer_capacity: usize,
    /// Source label used when a writer has none set
    pub default_source: String,
    pub log_category: String,
    pub wait_timeout_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            async_buffer_capacity: output::ASYNC_BUFFER_CAPACITY,
            default_source: output::DEFAULT_SOURCE.to_string(),
            log_category: output::LOG_CATEGORY.to_string(),
            wait_timeout_ms: output::DEFAULT_WAIT_TIMEOUT_MS,
        }
    }
}

impl OutputConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive overriding the environment default, e.g. `info`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub json: bool,
}

impl ReconcilerConfig {
    /// Validate the merged configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.queue.internal_queue_name.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queue.internal_queue_name",
                "queue configuration",
            ));
        }

        if self.queue.public_queue_name.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queue.public_queue_name",
                "queue configuration",
            ));
        }

        if self.queue.internal_queue_name == self.queue.public_queue_name {
            return Err(ConfigurationError::invalid_value(
                "queue.public_queue_name",
                self.queue.public_queue_name.clone(),
                "must differ from queue.internal_queue_name",
            ));
        }

        if self.queue.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.batch_size",
                "0",
                "batch size must be greater than 0",
            ));
        }

        if self.output.async_buffer_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "output.async_buffer_capacity",
                "0",
                "buffer capacity must be greater than 0",
            ));
        }

        if self.output.default_source.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "output.default_source",
                "output configuration",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReconcilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue.internal_queue_name, "harbor-app");
        assert_eq!(config.queue.public_queue_name, "harbor-app-public");
        assert_eq!(config.output.async_buffer_capacity, 1000);
        assert_eq!(config.queue.visibility_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ReconcilerConfig::default();
        config.queue.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));

        let mut config = ReconcilerConfig::default();
        config.queue.public_queue_name = config.queue.internal_queue_name.clone();
        assert!(config.validate().is_err());

        let mut config = ReconcilerConfig::default();
        config.output.default_source.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_partial_yaml_sections_use_defaults() {
        let config: ReconcilerConfig =
            serde_json::from_value(serde_json::json!({"queue": {"batch_size": 3}})).unwrap();
        assert_eq!(config.queue.batch_size, 3);
        assert_eq!(config.queue.polling_interval_ms, 1000);
        assert_eq!(config.output, OutputConfig::default());
    }
}
