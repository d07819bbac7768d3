use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};

use crate::constants::codes;
use crate::models::task::Task;

/// Kind of mutation recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ActionType {
    Create = codes::ACTION_CREATE,
    UpdateTitle = codes::ACTION_UPDATE_TITLE,
    UpdateStatus = codes::ACTION_UPDATE_STATUS,
    UpdateTitleStatus = codes::ACTION_UPDATE_TITLE_STATUS,
    Reprioritize = codes::ACTION_REPRIORITIZE,
}

impl ActionType {
    /// Classify a full-field update by what actually changed.
    ///
    /// Title or description edits count as a title update. An update that only moves the
    /// task is a reprioritization, and an update that changes nothing is still recorded
    /// as a title update (the client saved the content).
    pub fn for_update(before: &Task, after: &Task) -> ActionType {
        let content_changed =
            before.title != after.title || before.description != after.description;
        let status_changed = before.status != after.status;

        match (content_changed, status_changed) {
            (true, true) => ActionType::UpdateTitleStatus,
            (false, true) => ActionType::UpdateStatus,
            (true, false) => ActionType::UpdateTitle,
            (false, false) if before.priority != after.priority => ActionType::Reprioritize,
            (false, false) => ActionType::UpdateTitle,
        }
    }
}

/// TaskAction is one append-only audit entry, written in the same transaction as the
/// mutation it describes. Maps to the `task_actions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaskAction {
    pub id: i64,
    pub action_type: ActionType,
    pub user_id: i64,
    pub task_id: i64,
    pub ts: DateTime<Utc>,
}

impl TaskAction {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        action_type: ActionType,
        user_id: i64,
        task_id: i64,
    ) -> Result<TaskAction, sqlx::Error> {
        sqlx::query_as::<_, TaskAction>(
            r#"
            INSERT INTO task_actions (action_type, user_id, task_id)
            VALUES ($1, $2, $3)
            RETURNING id, action_type, user_id, task_id, ts
            "#,
        )
        .bind(action_type)
        .bind(user_id)
        .bind(task_id)
        .fetch_one(executor)
        .await
    }

    /// Audit history of one task, oldest first
    pub async fn list_by_task<'e, E: PgExecutor<'e>>(
        executor: E,
        task_id: i64,
        user_id: i64,
    ) -> Result<Vec<TaskAction>, sqlx::Error> {
        sqlx::query_as::<_, TaskAction>(
            r#"
            SELECT id, action_type, user_id, task_id, ts
            FROM task_actions
            WHERE task_id = $1 AND user_id = $2
            ORDER BY id ASC
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;

    fn task(title: &str, description: &str, status: TaskStatus, priority: i32) -> Task {
        Task {
            id: 1,
            title: title.to_string(),
            description: description.to_string(),
            status,
            user_id: 1,
            priority,
            creation_ts: Utc::now(),
        }
    }

    #[test]
    fn test_action_type_classification() {
        let before = task("a", "x", TaskStatus::Open, 100);

        let cases = [
            (task("b", "x", TaskStatus::Open, 100), ActionType::UpdateTitle),
            (task("a", "y", TaskStatus::Open, 100), ActionType::UpdateTitle),
            (task("a", "x", TaskStatus::Closed, i32::MIN), ActionType::UpdateStatus),
            (task("b", "x", TaskStatus::Closed, i32::MIN), ActionType::UpdateTitleStatus),
            (task("a", "x", TaskStatus::Open, 50), ActionType::Reprioritize),
            (task("a", "x", TaskStatus::Open, 100), ActionType::UpdateTitle),
        ];

        for (after, expected) in cases {
            assert_eq!(ActionType::for_update(&before, &after), expected, "{after:?}");
        }
    }

    #[test]
    fn test_action_codes_match_columns() {
        assert_eq!(ActionType::Create as i16, 0);
        assert_eq!(ActionType::UpdateTitleStatus as i16, 3);
        assert_eq!(ActionType::Reprioritize as i16, 4);
    }
}
