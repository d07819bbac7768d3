//! # Database
//!
//! PostgreSQL side of the storage seam: connection pooling, embedded migrations and
//! [`PgStore`], the transactional implementation of [`crate::store::TaskStore`] and
//! [`crate::store::UserStore`].

pub mod connection;
pub mod migrations;
pub mod pg_store;

pub use connection::{connect, DatabaseConnection};
pub use migrations::{run_migrations, MIGRATOR};
pub use pg_store::PgStore;
