//! # Configuration
//!
//! Typed configuration for the to-do service. Values are layered by
//! [`ConfigManager`]: built-in defaults, an optional YAML file, `TODO__`-prefixed
//! environment variables and finally `DATABASE_URL`.
//!
//! The loaded [`TodoConfig`] is passed explicitly into constructors; nothing reads it
//! from a global.
//!
//! ```rust,no_run
//! use todo_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let port = manager.config().http_server.port;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{priority, session};
use crate::error::{Result, TodoError};

pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoConfig {
    pub environment: String,
    pub http_server: HttpServerConfig,
    pub session: SessionConfig,
    pub database: DatabaseConfig,
    pub priority: PriorityConfig,
    pub logging: LoggingConfig,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            http_server: HttpServerConfig::default(),
            session: SessionConfig::default(),
            database: DatabaseConfig::default(),
            priority: PriorityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole request, storage calls included
    pub request_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
    pub cors_enabled: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
            request_timeout_ms: 4_000,
            shutdown_grace_ms: 10_000,
            cors_enabled: false,
        }
    }
}

impl HttpServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub secret_key: String,
    pub secure: bool,
    pub max_age_seconds: i64,
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_key: "secret_key".to_string(),
            secure: false,
            max_age_seconds: session::DEFAULT_MAX_AGE_SECONDS,
            cookie_name: session::DEFAULT_COOKIE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://todo_list:pg@localhost:5432/todo_list".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 5,
            run_migrations: true,
        }
    }
}

/// Gap sizes used by the priority allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub baseline: i32,
    pub create_delta: i32,
    pub gap_delta: i32,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            baseline: priority::DEFAULT_BASELINE,
            create_delta: priority::DEFAULT_CREATE_DELTA,
            gap_delta: priority::DEFAULT_GAP_DELTA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Explicit filter directive; when absent the level follows the environment
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: None,
        }
    }
}

impl TodoConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.secret_key.is_empty() {
            return Err(TodoError::ConfigurationError(
                "session.secret_key must not be empty".to_string(),
            ));
        }

        if self.is_production() && self.session.secret_key == SessionConfig::default().secret_key {
            return Err(TodoError::ConfigurationError(
                "session.secret_key must be overridden in production".to_string(),
            ));
        }

        if self.session.max_age_seconds <= 0 {
            return Err(TodoError::ConfigurationError(
                "session.max_age_seconds must be greater than 0".to_string(),
            ));
        }

        if self.priority.create_delta <= 0 || self.priority.gap_delta <= 0 {
            return Err(TodoError::ConfigurationError(format!(
                "priority deltas must be positive (create_delta={}, gap_delta={})",
                self.priority.create_delta, self.priority.gap_delta
            )));
        }

        if priority::is_sentinel(self.priority.baseline) {
            return Err(TodoError::ConfigurationError(
                "priority.baseline must not be a sentinel value".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(TodoError::ConfigurationError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(TodoError::ConfigurationError(format!(
                "database.min_connections ({}) exceeds database.max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TodoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_server.address(), "0.0.0.0:80");
        assert_eq!(config.priority.create_delta, 10_000);
    }

    #[test]
    fn test_production_requires_custom_secret() {
        let mut config = TodoConfig {
            environment: "production".to_string(),
            ..TodoConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TodoError::ConfigurationError(_))
        ));

        config.session.secret_key = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_deltas() {
        let mut config = TodoConfig::default();
        config.priority.gap_delta = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_pool_bounds() {
        let mut config = TodoConfig::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }
}
