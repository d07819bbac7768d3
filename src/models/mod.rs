//! # Models
//!
//! Row types for the `users`, `tasks` and `task_actions` tables and the SQL that reads
//! and writes them. Transactions are opened by the store, never here.

pub mod task;
pub mod task_action;
pub mod user;

pub use task::{NewTask, Task, TaskStatus, TaskUpdate};
pub use task_action::{ActionType, TaskAction};
pub use user::{NewUser, User};
