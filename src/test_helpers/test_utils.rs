//! # Test Utilities
//!
//! Database and configuration helpers that work both locally and in CI. `DATABASE_URL`
//! wins when it is set; otherwise the local test database is used.

use std::env;

use crate::config::{DatabaseConfig, SessionConfig, TodoConfig};

const LOCAL_TEST_DATABASE_URL: &str = "postgresql://todo_list:pg@localhost:5432/todo_list_test";

/// Get database URL for tests with fallback
pub fn get_test_database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| LOCAL_TEST_DATABASE_URL.to_string())
}

/// Configuration for tests: test environment, fixed session secret, default priorities.
pub fn test_config() -> TodoConfig {
    TodoConfig {
        environment: "test".to_string(),
        session: SessionConfig {
            secret_key: "test-session-secret".to_string(),
            ..SessionConfig::default()
        },
        database: DatabaseConfig {
            url: get_test_database_url(),
            ..DatabaseConfig::default()
        },
        ..TodoConfig::default()
    }
}
