//! # Task Model
//!
//! A user's to-do item and its place in that user's ordered list.
//!
//! ## Database Schema
//!
//! Maps to the `tasks` table:
//! - `id`: Primary key (BIGSERIAL)
//! - `title`, `description`: free text
//! - `status`: SMALLINT, 1 = open, 2 = closed
//! - `priority`: INTEGER, display order is `priority DESC, id ASC`
//! - `user_id`: owning user
//! - `creation_ts`: TIMESTAMPTZ
//!
//! Priorities only compare meaningfully between tasks of the same owner. Every query here
//! is scoped by `user_id`, so a task owned by someone else behaves exactly like a missing row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};

use crate::constants::{codes, priority};
use crate::error::{Result, TodoError};

/// Task lifecycle state, carried on the wire as its numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum TaskStatus {
    Open = codes::TASK_STATUS_OPEN,
    Closed = codes::TASK_STATUS_CLOSED,
}

impl TryFrom<i16> for TaskStatus {
    type Error = String;

    fn try_from(code: i16) -> std::result::Result<Self, Self::Error> {
        match code {
            codes::TASK_STATUS_OPEN => Ok(TaskStatus::Open),
            codes::TASK_STATUS_CLOSED => Ok(TaskStatus::Closed),
            other => Err(format!("unknown task status code {other}")),
        }
    }
}

impl From<TaskStatus> for i16 {
    fn from(status: TaskStatus) -> Self {
        status as i16
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Open => write!(f, "open"),
            TaskStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub user_id: i64,
    pub priority: i32,
    pub creation_ts: DateTime<Utc>,
}

/// New Task for creation (priority and timestamps are assigned by the store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub user_id: i64,
}

/// Full-field replacement of a task's mutable columns
///
/// Clients usually echo back a whole task; fields other than these are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: i32,
}

impl Task {
    pub fn is_closed(&self) -> bool {
        self.status == TaskStatus::Closed
    }

    /// Insert an open task with the given priority
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        new_task: &NewTask,
        priority: i32,
    ) -> std::result::Result<Task, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, status, priority, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, status, priority, user_id, creation_ts
            "#,
        )
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(TaskStatus::Open)
        .bind(priority)
        .bind(new_task.user_id)
        .fetch_one(executor)
        .await
    }

    /// Find a task by id, scoped to its owner
    pub async fn find_for_owner<'e, E: PgExecutor<'e>>(
        executor: E,
        task_id: i64,
        user_id: i64,
    ) -> std::result::Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT id, title, description, status, priority, user_id, creation_ts FROM tasks WHERE id = $1 AND user_id = $2",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Same as [`Task::find_for_owner`] but locks the row for the enclosing transaction
    pub async fn find_for_owner_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        task_id: i64,
        user_id: i64,
    ) -> std::result::Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT id, title, description, status, priority, user_id, creation_ts FROM tasks WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// List an owner's tasks in display order, optionally capped
    pub async fn list_for_owner<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: i64,
        limit: Option<i64>,
    ) -> std::result::Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, priority, user_id, creation_ts
            FROM tasks
            WHERE user_id = $1
            ORDER BY priority DESC, id ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Lock and list an owner's open tasks in display order
    pub async fn list_open_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: i64,
    ) -> std::result::Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, priority, user_id, creation_ts
            FROM tasks
            WHERE user_id = $1 AND status = $2
            ORDER BY priority DESC, id ASC
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(TaskStatus::Open)
        .fetch_all(executor)
        .await
    }

    /// Highest priority among an owner's open tasks
    pub async fn max_open_priority<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: i64,
    ) -> std::result::Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(priority) FROM tasks WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(TaskStatus::Open)
        .fetch_one(executor)
        .await
    }

    /// Write every mutable column of `task`, scoped to its owner
    pub async fn update_fields<'e, E: PgExecutor<'e>>(
        executor: E,
        task: &Task,
    ) -> std::result::Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $1, description = $2, status = $3, priority = $4
            WHERE id = $5 AND user_id = $6
            RETURNING id, title, description, status, priority, user_id, creation_ts
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.id)
        .bind(task.user_id)
        .fetch_optional(executor)
        .await
    }

    /// Write only the priority column, scoped to its owner
    pub async fn update_priority<'e, E: PgExecutor<'e>>(
        executor: E,
        task_id: i64,
        user_id: i64,
        priority: i32,
    ) -> std::result::Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET priority = $1
            WHERE id = $2 AND user_id = $3
            RETURNING id, title, description, status, priority, user_id, creation_ts
            "#,
        )
        .bind(priority)
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }
}

impl NewTask {
    pub fn validate(&self) -> Result<()> {
        validate_owner(self.user_id)?;
        validate_title(&self.title)
    }
}

impl TaskUpdate {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if self.status == TaskStatus::Open && priority::is_sentinel(self.priority) {
            return Err(TodoError::validation(format!(
                "priority {} is reserved and cannot be stored on an open task",
                self.priority
            )));
        }
        Ok(())
    }

    /// The row that results from applying this update to `current`
    ///
    /// `reopen_priority` is used when a closed task becomes open again. Closing always pins
    /// the priority to the closed sentinel, whatever the update carried.
    pub fn apply_to(&self, current: &Task, reopen_priority: i32) -> Task {
        let priority = match (current.status, self.status) {
            (_, TaskStatus::Closed) => priority::CLOSED,
            (TaskStatus::Closed, TaskStatus::Open) => reopen_priority,
            (TaskStatus::Open, TaskStatus::Open) => self.priority,
        };

        Task {
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            priority,
            ..current.clone()
        }
    }
}

/// Owner ids come from the session; anything non-positive means the context is broken.
pub fn validate_owner(user_id: i64) -> Result<()> {
    if user_id <= 0 {
        return Err(TodoError::validation(format!("invalid owner id {user_id}")));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TodoError::validation("task title cannot be empty"));
    }
    Ok(())
}
