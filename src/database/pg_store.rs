//! # PostgreSQL Store
//!
//! Every mutation opens one transaction, locks the rows it reads, writes the task change
//! and its `task_actions` entries, then commits. Any error before the commit drops the
//! transaction, which rolls it back, so a failed call leaves neither a task change nor an
//! audit row behind.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use crate::constants::priority::is_sentinel;
use crate::error::{Result, TodoError};
use crate::logging::log_task_operation;
use crate::models::task::validate_owner;
use crate::models::{
    ActionType, NewTask, NewUser, Task, TaskAction, TaskStatus, TaskUpdate, User,
};
use crate::priority::{Placement, PriorityAllocator, PriorityChange};
use crate::store::{ranked, TaskLimit, TaskStore, UserStore};

type PgTransaction = Transaction<'static, Postgres>;

fn storage(operation: &'static str) -> impl Fn(sqlx::Error) -> TodoError {
    move |e| TodoError::storage(operation, e)
}

fn task_not_found(task_id: i64) -> TodoError {
    TodoError::not_found(format!("task {task_id}"))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    allocator: PriorityAllocator,
}

impl PgStore {
    pub fn new(pool: PgPool, allocator: PriorityAllocator) -> Self {
        Self { pool, allocator }
    }

    async fn begin(&self, operation: &'static str) -> Result<PgTransaction> {
        self.pool.begin().await.map_err(storage(operation))
    }

    async fn commit(tx: PgTransaction, operation: &'static str) -> Result<()> {
        tx.commit().await.map_err(storage(operation))
    }

    /// Priority for a task entering the head of the owner's open list, renumbering the
    /// list first when the head has no room left.
    async fn head_priority(
        &self,
        tx: &mut PgTransaction,
        owner_id: i64,
        operation: &'static str,
    ) -> Result<i32> {
        let current_max = Task::max_open_priority(&mut **tx, owner_id)
            .await
            .map_err(storage(operation))?;

        match self.allocator.next_creation_priority(current_max) {
            Placement::At(priority) => Ok(priority),
            Placement::Collision => {
                let open = Task::list_open_for_update(&mut **tx, owner_id)
                    .await
                    .map_err(storage(operation))?;
                let plan = self.allocator.plan_head_insert(&ranked(&open));
                debug!(
                    owner_id = owner_id,
                    renumbered = plan.changes.len(),
                    "No room at list head, renumbered open tasks"
                );
                Self::apply_changes(tx, owner_id, &plan.changes, operation).await?;
                Ok(plan.target_priority)
            }
        }
    }

    async fn apply_changes(
        tx: &mut PgTransaction,
        owner_id: i64,
        changes: &[PriorityChange],
        operation: &'static str,
    ) -> Result<()> {
        for change in changes {
            Task::update_priority(&mut **tx, change.task_id, owner_id, change.to)
                .await
                .map_err(storage(operation))?
                .ok_or_else(|| task_not_found(change.task_id))?;
            TaskAction::create(
                &mut **tx,
                ActionType::Reprioritize,
                owner_id,
                change.task_id,
            )
            .await
            .map_err(storage(operation))?;
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for PgStore {
    #[instrument(skip(self, new_task), fields(owner_id = new_task.user_id))]
    async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        const OP: &str = "store.postgres.create_task";
        new_task.validate()?;

        let mut tx = self.begin(OP).await?;
        let priority = self.head_priority(&mut tx, new_task.user_id, OP).await?;

        let task = Task::insert(&mut *tx, &new_task, priority)
            .await
            .map_err(storage(OP))?;
        TaskAction::create(&mut *tx, ActionType::Create, task.user_id, task.id)
            .await
            .map_err(storage(OP))?;
        Self::commit(tx, OP).await?;

        log_task_operation("create_task", Some(task.id), task.user_id, "committed", None);
        Ok(task)
    }

    #[instrument(skip(self))]
    async fn get_task(&self, task_id: i64, owner_id: i64) -> Result<Task> {
        validate_owner(owner_id)?;

        Task::find_for_owner(&self.pool, task_id, owner_id)
            .await
            .map_err(storage("store.postgres.get_task"))?
            .ok_or_else(|| task_not_found(task_id))
    }

    #[instrument(skip(self))]
    async fn get_tasks(&self, owner_id: i64, limit: TaskLimit) -> Result<Vec<Task>> {
        validate_owner(owner_id)?;

        Task::list_for_owner(&self.pool, owner_id, limit.as_option())
            .await
            .map_err(storage("store.postgres.get_tasks"))
    }

    #[instrument(skip(self, update), fields(task_id = update.id))]
    async fn update_task(&self, update: TaskUpdate, owner_id: i64) -> Result<Task> {
        const OP: &str = "store.postgres.update_task";
        validate_owner(owner_id)?;
        update.validate()?;

        let mut tx = self.begin(OP).await?;
        let current = Task::find_for_owner_for_update(&mut *tx, update.id, owner_id)
            .await
            .map_err(storage(OP))?
            .ok_or_else(|| task_not_found(update.id))?;

        let reopen_priority = if current.is_closed() && update.status == TaskStatus::Open {
            self.head_priority(&mut tx, owner_id, OP).await?
        } else {
            current.priority
        };

        let next = update.apply_to(&current, reopen_priority);
        let action = ActionType::for_update(&current, &next);

        let task = Task::update_fields(&mut *tx, &next)
            .await
            .map_err(storage(OP))?
            .ok_or_else(|| task_not_found(update.id))?;
        TaskAction::create(&mut *tx, action, owner_id, task.id)
            .await
            .map_err(storage(OP))?;
        Self::commit(tx, OP).await?;

        log_task_operation(
            "update_task",
            Some(task.id),
            owner_id,
            "committed",
            Some(&format!("{action:?}")),
        );
        Ok(task)
    }

    #[instrument(skip(self))]
    async fn update_task_priority(
        &self,
        task_id: i64,
        owner_id: i64,
        priority: i32,
    ) -> Result<Task> {
        const OP: &str = "store.postgres.update_task_priority";
        validate_owner(owner_id)?;
        if is_sentinel(priority) {
            return Err(TodoError::validation(format!(
                "priority {priority} is reserved and cannot be stored on an open task"
            )));
        }

        let mut tx = self.begin(OP).await?;
        let current = Task::find_for_owner_for_update(&mut *tx, task_id, owner_id)
            .await
            .map_err(storage(OP))?
            .ok_or_else(|| task_not_found(task_id))?;
        if current.is_closed() {
            return Err(TodoError::validation(format!(
                "task {task_id} is closed and cannot be reprioritized"
            )));
        }

        let task = Task::update_priority(&mut *tx, task_id, owner_id, priority)
            .await
            .map_err(storage(OP))?
            .ok_or_else(|| task_not_found(task_id))?;
        TaskAction::create(&mut *tx, ActionType::Reprioritize, owner_id, task_id)
            .await
            .map_err(storage(OP))?;
        Self::commit(tx, OP).await?;

        log_task_operation("update_task_priority", Some(task_id), owner_id, "committed", None);
        Ok(task)
    }

    #[instrument(skip(self))]
    async fn rebalance_priorities(
        &self,
        task_id: i64,
        owner_id: i64,
        prev_priority: i32,
    ) -> Result<Task> {
        const OP: &str = "store.postgres.rebalance_priorities";
        validate_owner(owner_id)?;

        let mut tx = self.begin(OP).await?;
        let open = Task::list_open_for_update(&mut *tx, owner_id)
            .await
            .map_err(storage(OP))?;

        let Some(plan) = self
            .allocator
            .plan_move(&ranked(&open), task_id, prev_priority)
        else {
            let existing = Task::find_for_owner(&mut *tx, task_id, owner_id)
                .await
                .map_err(storage(OP))?;
            return Err(match existing {
                Some(_) => TodoError::validation(format!(
                    "task {task_id} is closed and cannot be reprioritized"
                )),
                None => task_not_found(task_id),
            });
        };

        Self::apply_changes(&mut tx, owner_id, &plan.changes, OP).await?;
        // The moved task is logged even when its renumbered slot equals its old value
        if !plan.changes.iter().any(|change| change.task_id == task_id) {
            TaskAction::create(&mut *tx, ActionType::Reprioritize, owner_id, task_id)
                .await
                .map_err(storage(OP))?;
        }
        let task = Task::find_for_owner(&mut *tx, task_id, owner_id)
            .await
            .map_err(storage(OP))?
            .ok_or_else(|| task_not_found(task_id))?;
        Self::commit(tx, OP).await?;

        log_task_operation(
            "rebalance_priorities",
            Some(task_id),
            owner_id,
            "committed",
            Some(&format!("renumbered {} rows", plan.changes.len())),
        );
        Ok(task)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(storage("store.postgres.health_check"))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        User::create(&self.pool, &new_user)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    TodoError::validation(format!(
                        "user with name [{}] already exists",
                        new_user.username
                    ))
                }
                other => TodoError::storage("store.postgres.create_user", other),
            })
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User> {
        User::find_by_username(&self.pool, username)
            .await
            .map_err(storage("store.postgres.get_user_by_username"))?
            .ok_or_else(|| TodoError::not_found(format!("user {username}")))
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<User> {
        User::find_by_id(&self.pool, user_id)
            .await
            .map_err(storage("store.postgres.get_user_by_id"))?
            .ok_or_else(|| TodoError::not_found(format!("user {user_id}")))
    }
}
