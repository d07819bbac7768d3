//! # Web API Request Handlers
//!
//! Thin adapters from JSON bodies and query strings onto the services. Request and response
//! shapes wrap a `task`, `tasks` or `user` field.

pub mod health;
pub mod tasks;
pub mod users;
