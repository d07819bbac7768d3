//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate. Sources are merged in order:
//! defaults, YAML file, `TODO__` environment variables, `DATABASE_URL`.

use super::TodoConfig;
use crate::error::{Result, TodoError};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_PATH_VAR: &str = "TODO_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/todo.yaml";
const ENV_PREFIX: &str = "TODO";

/// Owns the loaded configuration and where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: TodoConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from the process environment
    pub fn load() -> Result<Arc<ConfigManager>> {
        let config_path = env::var(CONFIG_PATH_VAR)
            .or_else(|_| env::var("CONFIG_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self::load_with_sources(&config_path, None, env::var("DATABASE_URL").ok())
    }

    /// Load configuration from explicit sources
    ///
    /// `env_overrides` replaces the process environment as the `TODO__` source when given,
    /// which keeps tests independent of global state.
    pub fn load_with_sources(
        config_path: &Path,
        env_overrides: Option<HashMap<String, String>>,
        database_url: Option<String>,
    ) -> Result<Arc<ConfigManager>> {
        debug!(config_path = %config_path.display(), "Loading configuration");

        let defaults = Config::try_from(&TodoConfig::default())
            .map_err(|e| TodoError::ConfigurationError(format!("Invalid defaults: {e}")))?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(config_path.to_path_buf())
                    .format(FileFormat::Yaml)
                    .required(false),
            );

        let mut environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true);
        if let Some(overrides) = env_overrides {
            environment = environment.source(Some(overrides));
        }
        builder = builder.add_source(environment);

        builder = builder
            .set_override_option("database.url", database_url)
            .map_err(|e| TodoError::ConfigurationError(format!("Invalid DATABASE_URL: {e}")))?;

        let config: TodoConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| {
                TodoError::ConfigurationError(format!(
                    "Failed to load configuration from {}: {e}",
                    config_path.display()
                ))
            })?;

        config.validate()?;

        info!(
            environment = %config.environment,
            address = %config.http_server.address(),
            config = %Self::sanitize_config_for_logging(&config),
            "Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            config_path: config_path.to_path_buf(),
        }))
    }

    pub fn config(&self) -> &TodoConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.config.environment
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Configuration as JSON with secrets masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    fn sanitize_config_for_logging(config: &TodoConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);
        Self::sanitize_json_recursive(&mut config_json, &["password", "secret", "key", "url"]);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive && val.is_string() {
                        *val = serde_json::Value::String("[MASKED]".to_string());
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp config file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let manager = ConfigManager::load_with_sources(
            Path::new("/nonexistent/todo.yaml"),
            Some(HashMap::new()),
            None,
        )
        .expect("defaults load");

        assert_eq!(manager.config(), &TodoConfig::default());
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let file = write_config(
            r#"
environment: test
http_server:
  port: 8081
priority:
  create_delta: 500
logging:
  format: json
"#,
        );

        let manager =
            ConfigManager::load_with_sources(file.path(), Some(HashMap::new()), None).unwrap();
        let config = manager.config();

        assert_eq!(manager.environment(), "test");
        assert_eq!(config.http_server.port, 8081);
        assert_eq!(config.http_server.host, "0.0.0.0");
        assert_eq!(config.priority.create_delta, 500);
        assert_eq!(config.priority.gap_delta, 10_000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_environment_and_database_url_take_precedence() {
        let file = write_config("http_server:\n  port: 8081\n");
        let env_overrides = HashMap::from([(
            "TODO__HTTP_SERVER__PORT".to_string(),
            "9090".to_string(),
        )]);

        let manager = ConfigManager::load_with_sources(
            file.path(),
            Some(env_overrides),
            Some("postgresql://override@db/todo".to_string()),
        )
        .unwrap();

        assert_eq!(manager.config().http_server.port, 9090);
        assert_eq!(manager.config().database.url, "postgresql://override@db/todo");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config("priority:\n  gap_delta: -5\n");
        let result = ConfigManager::load_with_sources(file.path(), Some(HashMap::new()), None);
        assert!(matches!(result, Err(TodoError::ConfigurationError(_))));
    }

    #[test]
    fn test_debug_config_masks_secrets() {
        let manager = ConfigManager::load_with_sources(
            Path::new("/nonexistent/todo.yaml"),
            Some(HashMap::new()),
            None,
        )
        .unwrap();
        let sanitized = manager.debug_config();

        assert_eq!(sanitized["session"]["secret_key"], "[MASKED]");
        assert_eq!(sanitized["database"]["url"], "[MASKED]");
        assert_eq!(sanitized["http_server"]["port"], 80);
    }
}
