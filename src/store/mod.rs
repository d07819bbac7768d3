//! # Storage Seam
//!
//! Traits the services depend on. [`crate::database::PgStore`] implements them over
//! PostgreSQL; tests use the in-memory store from `test_helpers`.
//!
//! Every mutating method is one atomic transaction: the row change and its
//! `task_actions` entry commit together or not at all. Reads and writes are always scoped
//! by owner, and a task owned by another user is reported as [`TodoError::NotFound`].
//!
//! No method spans several client operations. Two concurrent reorders of the same
//! user's tasks may both read stale neighbor priorities; whichever commits last wins the
//! priority column. There is no version check.
//!
//! [`TodoError::NotFound`]: crate::error::TodoError::NotFound

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewTask, NewUser, Task, TaskUpdate, User};
use crate::priority::RankedTask;

/// Row cap for [`TaskStore::get_tasks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskLimit {
    Unbounded,
    AtMost(i64),
}

impl TaskLimit {
    /// Interpret a wire limit where `i64::MAX` means "no limit"
    pub fn from_raw(limit: i64) -> Result<Self> {
        use crate::constants::priority::UNBOUNDED_LIMIT;
        use crate::error::TodoError;

        match limit {
            UNBOUNDED_LIMIT => Ok(TaskLimit::Unbounded),
            l if l < 0 => Err(TodoError::validation(format!("invalid limit {l}"))),
            l => Ok(TaskLimit::AtMost(l)),
        }
    }

    pub fn as_option(self) -> Option<i64> {
        match self {
            TaskLimit::Unbounded => None,
            TaskLimit::AtMost(limit) => Some(limit),
        }
    }
}

/// Project tasks already in display order onto what the rebalance planner needs
pub fn ranked(tasks: &[Task]) -> Vec<RankedTask> {
    tasks
        .iter()
        .map(|task| RankedTask {
            task_id: task.id,
            priority: task.priority,
        })
        .collect()
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert an open task at the head of the owner's list and log a create action.
    async fn create_task(&self, new_task: NewTask) -> Result<Task>;

    async fn get_task(&self, task_id: i64, owner_id: i64) -> Result<Task>;

    /// Owner's tasks ordered by `priority DESC, id ASC`, fully materialized.
    async fn get_tasks(&self, owner_id: i64, limit: TaskLimit) -> Result<Vec<Task>>;

    /// Replace title, description, status and priority; log the matching update action.
    ///
    /// Closing pins the priority to the closed sentinel. Reopening moves the task to the
    /// head of the list.
    async fn update_task(&self, update: TaskUpdate, owner_id: i64) -> Result<Task>;

    /// Write only the priority column and log a reprioritize action.
    async fn update_task_priority(&self, task_id: i64, owner_id: i64, priority: i32)
        -> Result<Task>;

    /// Renumber the owner's open tasks, moving `task_id` directly below the last task whose
    /// priority is `>= prev_priority`. Logs a reprioritize action for every row whose
    /// priority changed.
    async fn rebalance_priorities(
        &self,
        task_id: i64,
        owner_id: i64,
        prev_priority: i32,
    ) -> Result<Task>;

    /// Liveness check of the underlying storage
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; a taken username is a validation error.
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    async fn get_user_by_username(&self, username: &str) -> Result<User>;

    async fn get_user_by_id(&self, user_id: i64) -> Result<User>;
}
