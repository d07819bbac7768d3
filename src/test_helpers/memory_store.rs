//! # In-Memory Store
//!
//! A [`TaskStore`] and [`UserStore`] held behind one mutex, for service and HTTP tests
//! that must run without PostgreSQL.
//!
//! Each mutation works on a clone of the state and swaps it in only on success, which
//! gives the same all-or-nothing outcome as a database transaction. The audit insert can
//! be made to fail with [`InMemoryStore::fail_action_log`] to exercise rollback.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::constants::priority::is_sentinel;
use crate::error::{Result, TodoError};
use crate::models::task::validate_owner;
use crate::models::{
    ActionType, NewTask, NewUser, Task, TaskAction, TaskStatus, TaskUpdate, User,
};
use crate::priority::{Placement, PriorityAllocator, PriorityChange};
use crate::store::{ranked, TaskLimit, TaskStore, UserStore};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    actions: Vec<TaskAction>,
    next_user_id: i64,
    next_task_id: i64,
    next_action_id: i64,
}

/// Working copy handed to one mutation
struct Working {
    state: MemoryState,
    fail_action_log: bool,
    operation: &'static str,
}

impl Working {
    fn owned_task(&self, task_id: i64, owner_id: i64) -> Result<Task> {
        self.state
            .tasks
            .get(&task_id)
            .filter(|task| task.user_id == owner_id)
            .cloned()
            .ok_or_else(|| TodoError::not_found(format!("task {task_id}")))
    }

    fn open_tasks(&self, owner_id: i64) -> Vec<Task> {
        let mut open: Vec<Task> = self
            .state
            .tasks
            .values()
            .filter(|task| task.user_id == owner_id && !task.is_closed())
            .cloned()
            .collect();
        sort_display_order(&mut open);
        open
    }

    fn log_action(&mut self, action_type: ActionType, user_id: i64, task_id: i64) -> Result<()> {
        if self.fail_action_log {
            return Err(TodoError::storage(
                self.operation,
                "injected task_actions insert failure",
            ));
        }

        self.state.next_action_id += 1;
        self.state.actions.push(TaskAction {
            id: self.state.next_action_id,
            action_type,
            user_id,
            task_id,
            ts: Utc::now(),
        });
        Ok(())
    }

    fn apply_changes(&mut self, owner_id: i64, changes: &[PriorityChange]) -> Result<()> {
        for change in changes {
            if let Some(task) = self.state.tasks.get_mut(&change.task_id) {
                task.priority = change.to;
            }
            self.log_action(ActionType::Reprioritize, owner_id, change.task_id)?;
        }
        Ok(())
    }

    fn head_priority(&mut self, allocator: &PriorityAllocator, owner_id: i64) -> Result<i32> {
        let open = self.open_tasks(owner_id);
        let current_max = open.first().map(|task| task.priority);

        match allocator.next_creation_priority(current_max) {
            Placement::At(priority) => Ok(priority),
            Placement::Collision => {
                let plan = allocator.plan_head_insert(&ranked(&open));
                self.apply_changes(owner_id, &plan.changes)?;
                Ok(plan.target_priority)
            }
        }
    }
}

fn sort_display_order(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    allocator: PriorityAllocator,
    fail_action_log: AtomicBool,
}

impl InMemoryStore {
    pub fn new(allocator: PriorityAllocator) -> Self {
        Self {
            allocator,
            ..Self::default()
        }
    }

    /// Make every later audit insert fail until switched off again
    pub fn fail_action_log(&self, fail: bool) {
        self.fail_action_log.store(fail, Ordering::SeqCst);
    }

    /// Insert a user directly, bypassing password hashing
    pub fn seed_user(&self, username: &str) -> User {
        let mut state = self.state.lock();
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username: username.to_string(),
            password_hash: String::new(),
            email: format!("{username}@example.com"),
            creation_ts: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        user
    }

    /// Insert a task with an exact priority and no audit entry
    pub fn seed_task(&self, owner_id: i64, title: &str, status: TaskStatus, priority: i32) -> Task {
        let mut state = self.state.lock();
        state.next_task_id += 1;
        let task = Task {
            id: state.next_task_id,
            title: title.to_string(),
            description: String::new(),
            status,
            user_id: owner_id,
            priority,
            creation_ts: Utc::now(),
        };
        state.tasks.insert(task.id, task.clone());
        task
    }

    pub fn task_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn actions(&self) -> Vec<TaskAction> {
        self.state.lock().actions.clone()
    }

    pub fn actions_for_task(&self, task_id: i64) -> Vec<TaskAction> {
        self.state
            .lock()
            .actions
            .iter()
            .filter(|action| action.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Run `f` against a copy of the state and keep the copy only if `f` succeeds.
    fn transact<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Working) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.state.lock();
        let mut working = Working {
            state: guard.clone(),
            fail_action_log: self.fail_action_log.load(Ordering::SeqCst),
            operation,
        };

        let value = f(&mut working)?;
        *guard = working.state;
        Ok(value)
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        new_task.validate()?;
        let allocator = self.allocator;

        self.transact("store.memory.create_task", |tx| {
            if !tx.state.users.contains_key(&new_task.user_id) {
                return Err(TodoError::storage(
                    tx.operation,
                    format!("user {} does not exist", new_task.user_id),
                ));
            }

            let priority = tx.head_priority(&allocator, new_task.user_id)?;
            tx.state.next_task_id += 1;
            let task = Task {
                id: tx.state.next_task_id,
                title: new_task.title.clone(),
                description: new_task.description.clone(),
                status: TaskStatus::Open,
                user_id: new_task.user_id,
                priority,
                creation_ts: Utc::now(),
            };
            tx.state.tasks.insert(task.id, task.clone());
            tx.log_action(ActionType::Create, task.user_id, task.id)?;
            Ok(task)
        })
    }

    async fn get_task(&self, task_id: i64, owner_id: i64) -> Result<Task> {
        validate_owner(owner_id)?;

        self.state
            .lock()
            .tasks
            .get(&task_id)
            .filter(|task| task.user_id == owner_id)
            .cloned()
            .ok_or_else(|| TodoError::not_found(format!("task {task_id}")))
    }

    async fn get_tasks(&self, owner_id: i64, limit: TaskLimit) -> Result<Vec<Task>> {
        validate_owner(owner_id)?;

        let mut tasks: Vec<Task> = self
            .state
            .lock()
            .tasks
            .values()
            .filter(|task| task.user_id == owner_id)
            .cloned()
            .collect();
        sort_display_order(&mut tasks);

        if let Some(limit) = limit.as_option() {
            tasks.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(tasks)
    }

    async fn update_task(&self, update: TaskUpdate, owner_id: i64) -> Result<Task> {
        validate_owner(owner_id)?;
        update.validate()?;
        let allocator = self.allocator;

        self.transact("store.memory.update_task", |tx| {
            let current = tx.owned_task(update.id, owner_id)?;
            let reopen_priority = if current.is_closed() && update.status == TaskStatus::Open {
                tx.head_priority(&allocator, owner_id)?
            } else {
                current.priority
            };

            let next = update.apply_to(&current, reopen_priority);
            let action = ActionType::for_update(&current, &next);
            tx.state.tasks.insert(next.id, next.clone());
            tx.log_action(action, owner_id, next.id)?;
            Ok(next)
        })
    }

    async fn update_task_priority(
        &self,
        task_id: i64,
        owner_id: i64,
        priority: i32,
    ) -> Result<Task> {
        validate_owner(owner_id)?;
        if is_sentinel(priority) {
            return Err(TodoError::validation(format!(
                "priority {priority} is reserved and cannot be stored on an open task"
            )));
        }

        self.transact("store.memory.update_task_priority", |tx| {
            let mut task = tx.owned_task(task_id, owner_id)?;
            if task.is_closed() {
                return Err(TodoError::validation(format!(
                    "task {task_id} is closed and cannot be reprioritized"
                )));
            }

            task.priority = priority;
            tx.state.tasks.insert(task.id, task.clone());
            tx.log_action(ActionType::Reprioritize, owner_id, task_id)?;
            Ok(task)
        })
    }

    async fn rebalance_priorities(
        &self,
        task_id: i64,
        owner_id: i64,
        prev_priority: i32,
    ) -> Result<Task> {
        validate_owner(owner_id)?;
        let allocator = self.allocator;

        self.transact("store.memory.rebalance_priorities", |tx| {
            let open = tx.open_tasks(owner_id);
            let Some(plan) = allocator.plan_move(&ranked(&open), task_id, prev_priority) else {
                tx.owned_task(task_id, owner_id)?;
                return Err(TodoError::validation(format!(
                    "task {task_id} is closed and cannot be reprioritized"
                )));
            };

            tx.apply_changes(owner_id, &plan.changes)?;
            if !plan.changes.iter().any(|change| change.task_id == task_id) {
                tx.log_action(ActionType::Reprioritize, owner_id, task_id)?;
            }
            tx.owned_task(task_id, owner_id)
        })
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.transact("store.memory.create_user", |tx| {
            if tx
                .state
                .users
                .values()
                .any(|user| user.username == new_user.username)
            {
                return Err(TodoError::validation(format!(
                    "user with name [{}] already exists",
                    new_user.username
                )));
            }

            tx.state.next_user_id += 1;
            let user = User {
                id: tx.state.next_user_id,
                username: new_user.username.clone(),
                password_hash: new_user.password_hash.clone(),
                email: new_user.email.clone(),
                creation_ts: Utc::now(),
            };
            tx.state.users.insert(user.id, user.clone());
            Ok(user)
        })
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.state
            .lock()
            .users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .ok_or_else(|| TodoError::not_found(format!("user {username}")))
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<User> {
        self.state
            .lock()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| TodoError::not_found(format!("user {user_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task(user_id: i64, title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_failed_audit_insert_rolls_back_task() {
        let store = InMemoryStore::default();
        let owner = store.seed_user("alice");

        store.fail_action_log(true);
        let err = store.create_task(new_task(owner.id, "A")).await.unwrap_err();
        assert!(matches!(err, TodoError::StorageError { .. }));
        assert_eq!(store.task_count(), 0);
        assert!(store.actions().is_empty());

        store.fail_action_log(false);
        store.create_task(new_task(owner.id, "A")).await.unwrap();
        assert_eq!(store.task_count(), 1);
        assert_eq!(store.actions().len(), 1);
    }

    #[tokio::test]
    async fn test_creation_requires_existing_owner() {
        let store = InMemoryStore::default();
        let err = store.create_task(new_task(42, "orphan")).await.unwrap_err();
        assert!(matches!(err, TodoError::StorageError { .. }));
        assert_eq!(store.task_count(), 0);
    }

    #[tokio::test]
    async fn test_head_overflow_renumbers_before_insert() {
        let store = InMemoryStore::default();
        let owner = store.seed_user("alice");
        let top = store.seed_task(owner.id, "top", TaskStatus::Open, i32::MAX - 1);
        let low = store.seed_task(owner.id, "low", TaskStatus::Open, 5);

        let created = store.create_task(new_task(owner.id, "new")).await.unwrap();
        let tasks = store.get_tasks(owner.id, TaskLimit::Unbounded).await.unwrap();

        let order: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![created.id, top.id, low.id]);
        assert!(tasks.windows(2).all(|w| w[0].priority > w[1].priority));
        // two reprioritize entries plus the create
        assert_eq!(store.actions().len(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let store = InMemoryStore::default();
        let user = NewUser {
            username: "bob".to_string(),
            password_hash: "hash".to_string(),
            email: String::new(),
        };

        store.create_user(user.clone()).await.unwrap();
        let err = store.create_user(user).await.unwrap_err();
        assert_eq!(
            err,
            TodoError::validation("user with name [bob] already exists")
        );
    }
}
