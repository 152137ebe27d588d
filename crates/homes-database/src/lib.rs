//! SQLite storage layer for homes.
//!
//! This crate provides:
//! - [`HomeStore`], the blocking storage contract the resolution service consumes
//! - [`Database`], a single-connection store (in-memory for tests)
//! - [`DatabasePool`], an r2d2 pool with WAL mode for concurrent background readers
//! - Versioned migrations for the `players` and `homes` tables
//! - Query helpers in [`queries`] that work with any `Connection`
//!
//! Every call blocks. Callers are responsible for keeping them off the
//! controlling thread.

mod db;
mod error;
mod migrations;
mod pool;
pub mod queries;
mod store;

pub use db::Database;
pub use error::{DatabaseError, DatabaseResult};
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use pool::{DatabasePool, PoolConfig, PoolState};
pub use store::HomeStore;
