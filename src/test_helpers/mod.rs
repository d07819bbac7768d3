// Test Helpers Module - shared fixtures for unit and integration tests.
//
// The in-memory store lets service and HTTP tests run without a database; the
// configuration helpers point at the PostgreSQL test database.

pub mod memory_store;
pub mod test_utils;

pub use memory_store::InMemoryStore;
pub use test_utils::{get_test_database_url, test_config};
