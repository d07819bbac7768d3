//! # Web API Application State
//!
//! Shared, cheaply cloneable state handed to every handler: configuration, the two
//! services and the session authenticator.

use std::sync::Arc;

use tracing::info;

use crate::config::TodoConfig;
use crate::error::{Result, TodoError};
use crate::priority::PriorityAllocator;
use crate::services::{TaskService, UserService};
use crate::store::{TaskStore, UserStore};
use crate::web::auth::SessionAuthenticator;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TodoConfig>,
    pub task_service: TaskService,
    pub user_service: UserService,
    pub authenticator: Arc<SessionAuthenticator>,
}

impl AppState {
    pub fn new(
        config: TodoConfig,
        task_store: Arc<dyn TaskStore>,
        user_store: Arc<dyn UserStore>,
    ) -> Result<Self> {
        let authenticator = SessionAuthenticator::from_config(&config.session)
            .map_err(|e| TodoError::ConfigurationError(e.to_string()))?;
        let allocator = PriorityAllocator::from_config(&config.priority);

        info!(
            environment = %config.environment,
            create_delta = allocator.create_delta(),
            gap_delta = allocator.gap_delta(),
            "Web application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            task_service: TaskService::new(task_store, allocator),
            user_service: UserService::new(user_store),
            authenticator: Arc::new(authenticator),
        })
    }

    /// State over one store that serves both tasks and users
    pub fn from_store<S>(config: TodoConfig, store: Arc<S>) -> Result<Self>
    where
        S: TaskStore + UserStore + 'static,
    {
        Self::new(config, store.clone(), store)
    }
}
