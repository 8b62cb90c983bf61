//! Configuration Loader
//!
//! Environment-aware configuration loading: detects the environment, layers
//! the YAML files and environment variables over the built-in defaults, and
//! validates the result.

use super::error::{ConfigResult, ConfigurationError};
use super::ReconcilerConfig;
use crate::constants::system;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix for environment variable overrides (`HARBOR__QUEUE__BATCH_SIZE`)
pub const ENV_PREFIX: &str = "HARBOR";
const ENV_SEPARATOR: &str = "__";
const BASE_FILE_STEM: &str = "harbor";

#[derive(Debug)]
pub struct ConfigManager {
    config: ReconcilerConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_env_source(config_dir, environment, None)
    }

    /// Same as [`Self::load_from_directory_with_env`], reading environment
    /// variable overrides from `env_vars` instead of the process environment
    /// when given. Keys use the `HARBOR__SECTION__KEY` form.
    pub fn load_with_env_source(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_vars: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment, env_vars)?;
        config.validate()?;

        info!(
            environment = %environment,
            internal_queue = %config.queue.internal_queue_name,
            public_queue = %config.queue.public_queue_name,
            batch_size = config.queue.batch_size,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: ReconcilerConfig, environment: &str) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            environment: environment.to_string(),
            config_directory: Self::default_config_directory(),
        })
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON, for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
        env_vars: Option<HashMap<String, String>>,
    ) -> ConfigResult<ReconcilerConfig> {
        let base_path = config_directory.join(format!("{BASE_FILE_STEM}.yaml"));
        let env_path = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.yaml"));

        debug!(
            base = %base_path.display(),
            base_exists = base_path.exists(),
            overrides = %env_path.display(),
            overrides_exist = env_path.exists(),
            "Layering configuration sources"
        );

        let defaults = Config::try_from(&ReconcilerConfig::default())?;
        let env_source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env_vars);

        let merged = Config::builder()
            .add_source(defaults)
            .add_source(File::from(base_path).required(false))
            .add_source(File::from(env_path).required(false))
            .add_source(env_source)
            .build()
            .map_err(|e| ConfigurationError::environment_config_error(environment, e))?;

        Ok(merged.try_deserialize::<ReconcilerConfig>()?)
    }

    /// Detect the current environment from `HARBOR_ENV`, then `APP_ENV`
    pub fn detect_environment() -> String {
        Self::resolve_environment(
            env::var(system::ENVIRONMENT_VARIABLE).ok(),
            env::var("APP_ENV").ok(),
        )
    }

    fn resolve_environment(harbor_env: Option<String>, app_env: Option<String>) -> String {
        harbor_env
            .or(app_env)
            .unwrap_or_else(|| system::DEFAULT_ENVIRONMENT.to_string())
            .to_lowercase()
    }

    /// `HARBOR_CONFIG_DIR` if set, otherwise `./config`
    fn default_config_directory() -> PathBuf {
        env::var("HARBOR_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_environment_resolution_prefers_harbor_env_and_lowercases() {
        let resolve = ConfigManager::resolve_environment;
        assert_eq!(
            resolve(Some("Production".into()), Some("test".into())),
            "production"
        );
        assert_eq!(resolve(None, Some("STAGING".into())), "staging");
        assert_eq!(resolve(None, None), "development");
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let manager =
            ConfigManager::load_with_env_source(Some(dir.path().to_path_buf()), "test", no_env())
                .unwrap();
        assert_eq!(manager.config(), &ReconcilerConfig::default());
        assert_eq!(manager.environment(), "test");
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("harbor.yaml"),
            "queue:\n  batch_size: 20\n  polling_interval_ms: 500\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("harbor.production.yaml"),
            "queue:\n  batch_size: 50\nlogging:\n  json: true\n",
        )
        .unwrap();

        let manager = ConfigManager::load_with_env_source(
            Some(dir.path().to_path_buf()),
            "production",
            no_env(),
        )
        .unwrap();
        let config = manager.config();
        assert_eq!(config.queue.batch_size, 50);
        assert_eq!(config.queue.polling_interval_ms, 500);
        assert!(config.logging.json);
        assert_eq!(config.queue.internal_queue_name, "harbor-app");
    }

    #[test]
    fn test_env_vars_override_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("harbor.yaml"), "output:\n  default_source: web\n").unwrap();

        let vars = HashMap::from([
            ("HARBOR__OUTPUT__DEFAULT_SOURCE".to_string(), "worker".to_string()),
            ("HARBOR__QUEUE__BATCH_SIZE".to_string(), "7".to_string()),
        ]);
        let manager =
            ConfigManager::load_with_env_source(Some(dir.path().to_path_buf()), "test", Some(vars))
                .unwrap();
        assert_eq!(manager.config().output.default_source, "worker");
        assert_eq!(manager.config().queue.batch_size, 7);
    }

    #[test]
    fn test_invalid_merged_config_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("harbor.yaml"), "queue:\n  batch_size: 0\n").unwrap();
        let result =
            ConfigManager::load_with_env_source(Some(dir.path().to_path_buf()), "test", no_env());
        assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_yaml_is_load_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("harbor.yaml"), "queue: [unclosed\n").unwrap();
        let result =
            ConfigManager::load_with_env_source(Some(dir.path().to_path_buf()), "test", no_env());
        assert!(result.is_err());
    }
}
