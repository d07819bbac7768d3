#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Todo Core
//!
//! Multi-user to-do list backend: accounts, sessions, and per-user task lists with a
//! manually adjustable order.
//!
//! ## Ordering
//!
//! Each task carries an integer priority and a user's list is displayed by
//! `priority DESC, id ASC`. Moving a task writes only that task's priority, chosen
//! strictly between its new neighbors by the [`priority`] allocator. Closed tasks are
//! pinned to `i32::MIN` and sort last. When neighbors leave no integer gap the user's
//! open list is renumbered inside the same transaction.
//!
//! ## Audit Trail
//!
//! Every mutation appends a `task_actions` row in the transaction that performs it, so a
//! task change and its audit entry are committed together or not at all.
//!
//! ## Module Organization
//!
//! - [`priority`] - Priority allocation and rebalance planning
//! - [`models`] - Row types and their SQL
//! - [`store`] - Storage traits used by the services
//! - [`database`] - PostgreSQL pool, migrations and [`database::PgStore`]
//! - [`services`] - Task and user orchestration with explicit request context
//! - [`web`] - axum HTTP boundary and session handling
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use todo_core::config::TodoConfig;
//! use todo_core::database::{connect, run_migrations, PgStore};
//! use todo_core::priority::PriorityAllocator;
//! use todo_core::services::{RequestContext, TaskService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TodoConfig::default();
//! let pool = connect(&config.database).await?;
//! run_migrations(&pool).await?;
//!
//! let allocator = PriorityAllocator::from_config(&config.priority);
//! let store = Arc::new(PgStore::new(pool, allocator));
//! let tasks = TaskService::new(store, allocator);
//!
//! let ctx = RequestContext::for_user(1);
//! let task = tasks.create_task(&ctx, "buy milk".into(), String::new()).await?;
//! println!("{} at priority {}", task.title, task.priority);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod priority;
pub mod services;
pub mod store;
pub mod web;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

pub use config::{ConfigManager, TodoConfig};
pub use error::{Result, TodoError};
pub use models::{ActionType, NewTask, Task, TaskAction, TaskStatus, TaskUpdate, User};
pub use priority::{Placement, PriorityAllocator};
pub use services::{RequestContext, TaskService, UserService};
pub use store::{TaskLimit, TaskStore, UserStore};
