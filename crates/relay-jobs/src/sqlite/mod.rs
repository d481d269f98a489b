//! SQLite-backed job store.

mod store;

pub use store::SqliteJobStore;
