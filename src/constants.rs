//! # System Constants
//!
//! Priority sentinels and defaults, task status codes and audit action codes shared by
//! the allocator, the stores and the HTTP boundary.
//!
//! Priorities are `i32` to match the `INTEGER` column and the wire contract of existing
//! clients, which send `2147483647` / `-2147483648` when a task has no neighbor.

/// Priority sentinels and defaults
pub mod priority {
    /// Sentinel for "no task above": the target moves to the head of the list.
    /// Never stored on a row.
    pub const MAX_SENTINEL: i32 = i32::MAX;

    /// Sentinel for "no task below": the target moves to the tail of the open list.
    pub const MIN_SENTINEL: i32 = i32::MIN;

    /// Every closed task is pinned to this value so it sorts after all open tasks.
    pub const CLOSED: i32 = i32::MIN;

    /// Effective maximum for a user with no open tasks.
    pub const DEFAULT_BASELINE: i32 = 0;

    /// Added to the current maximum when a task is created.
    pub const DEFAULT_CREATE_DELTA: i32 = 10_000;

    /// Added/subtracted when a task is placed at either end of the list.
    pub const DEFAULT_GAP_DELTA: i32 = 10_000;

    /// `get_tasks` limit meaning "no limit".
    pub const UNBOUNDED_LIMIT: i64 = i64::MAX;

    /// Returns true for values a stored open task may never carry.
    pub fn is_sentinel(priority: i32) -> bool {
        priority == MAX_SENTINEL || priority == MIN_SENTINEL
    }
}

/// Wire and column codes
pub mod codes {
    pub const TASK_STATUS_OPEN: i16 = 1;
    pub const TASK_STATUS_CLOSED: i16 = 2;

    pub const ACTION_CREATE: i16 = 0;
    pub const ACTION_UPDATE_TITLE: i16 = 1;
    pub const ACTION_UPDATE_STATUS: i16 = 2;
    pub const ACTION_UPDATE_TITLE_STATUS: i16 = 3;
    pub const ACTION_REPRIORITIZE: i16 = 4;
}

/// Session cookie defaults
pub mod session {
    pub const DEFAULT_COOKIE_NAME: &str = "todo_session";

    /// One week, as in the original cookie store.
    pub const DEFAULT_MAX_AGE_SECONDS: i64 = 604_800;

    pub const REQUEST_ID_HEADER: &str = "x-request-id";
}
