//! # Task Service
//!
//! Owner-scoped task operations on top of a [`TaskStore`].
//!
//! Reordering is client-driven: the client names the target task and the priorities of the
//! neighbors it should end up between, taken from its last listing. The service checks
//! ownership, asks the [`PriorityAllocator`] for a value strictly between those neighbors and
//! writes only the target's priority. When the neighbors leave no room the store renumbers
//! the owner's open list in one transaction instead.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::constants::priority::{MAX_SENTINEL, MIN_SENTINEL};
use crate::error::{Result, TodoError};
use crate::logging::log_task_operation;
use crate::models::{NewTask, Task, TaskUpdate};
use crate::priority::{Placement, PriorityAllocator};
use crate::services::RequestContext;
use crate::store::{TaskLimit, TaskStore};

/// Move `task_id` between the tasks currently holding `prev_priority` (above) and
/// `next_priority` (below)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub task_id: i64,
    pub prev_priority: i32,
    pub next_priority: i32,
}

impl ReorderRequest {
    /// Missing neighbors become the top and bottom sentinels.
    pub fn new(task_id: i64, prev_priority: Option<i32>, next_priority: Option<i32>) -> Self {
        Self {
            task_id,
            prev_priority: prev_priority.unwrap_or(MAX_SENTINEL),
            next_priority: next_priority.unwrap_or(MIN_SENTINEL),
        }
    }
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    allocator: PriorityAllocator,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, allocator: PriorityAllocator) -> Self {
        Self { store, allocator }
    }

    #[instrument(
        skip(self, ctx, description),
        fields(user_id = ctx.user_id, request_id = %ctx.request_id)
    )]
    pub async fn create_task(
        &self,
        ctx: &RequestContext,
        title: String,
        description: String,
    ) -> Result<Task> {
        let task = self
            .store
            .create_task(NewTask {
                title,
                description,
                user_id: ctx.user_id,
            })
            .await?;

        debug!(task_id = task.id, priority = task.priority, "Task created");
        Ok(task)
    }

    #[instrument(skip(self, ctx), fields(user_id = ctx.user_id, request_id = %ctx.request_id))]
    pub async fn get_task(&self, ctx: &RequestContext, task_id: i64) -> Result<Task> {
        self.store.get_task(task_id, ctx.user_id).await
    }

    /// The caller's tasks in display order; `i64::MAX` means no limit.
    #[instrument(skip(self, ctx), fields(user_id = ctx.user_id, request_id = %ctx.request_id))]
    pub async fn get_tasks(&self, ctx: &RequestContext, limit: i64) -> Result<Vec<Task>> {
        let limit = TaskLimit::from_raw(limit)?;
        self.store.get_tasks(ctx.user_id, limit).await
    }

    #[instrument(
        skip(self, ctx, update),
        fields(user_id = ctx.user_id, request_id = %ctx.request_id, task_id = update.id)
    )]
    pub async fn update_task(&self, ctx: &RequestContext, update: TaskUpdate) -> Result<Task> {
        self.store.update_task(update, ctx.user_id).await
    }

    #[instrument(skip(self, ctx), fields(user_id = ctx.user_id, request_id = %ctx.request_id))]
    pub async fn reorder_task(
        &self,
        ctx: &RequestContext,
        request: ReorderRequest,
    ) -> Result<Task> {
        let task = self.store.get_task(request.task_id, ctx.user_id).await?;
        if task.is_closed() {
            return Err(TodoError::validation(format!(
                "task {} is closed and cannot be reprioritized",
                task.id
            )));
        }

        let placement = self
            .allocator
            .between_priority(request.prev_priority, request.next_priority)?;

        let updated = match placement {
            Placement::At(priority) => {
                self.store
                    .update_task_priority(task.id, ctx.user_id, priority)
                    .await?
            }
            Placement::Collision => {
                log_task_operation(
                    "reorder_task",
                    Some(task.id),
                    ctx.user_id,
                    "collision",
                    Some("no free priority between neighbors, renumbering open tasks"),
                );
                self.store
                    .rebalance_priorities(task.id, ctx.user_id, request.prev_priority)
                    .await?
            }
        };

        debug!(
            task_id = updated.id,
            from = task.priority,
            to = updated.priority,
            "Task reordered"
        );
        Ok(updated)
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }
}
