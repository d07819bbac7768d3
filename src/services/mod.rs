//! # Services
//!
//! Orchestration between the HTTP boundary and the stores. Every call takes an explicit
//! [`RequestContext`] built from the verified session; services never read ambient state.

pub mod task_service;
pub mod user_service;

pub use task_service::{ReorderRequest, TaskService};
pub use user_service::{Credentials, SignUpRequest, UserService};

use uuid::Uuid;

/// Caller identity and correlation id for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: i64,
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new(user_id: i64, request_id: Uuid) -> Self {
        Self {
            user_id,
            request_id,
        }
    }

    /// Context with a fresh request id, for callers outside the HTTP stack
    pub fn for_user(user_id: i64) -> Self {
        Self::new(user_id, Uuid::new_v4())
    }
}
