//! Connection pool for concurrent database access.
//!
//! Uses r2d2 and SQLite WAL mode. WAL lets background readers proceed while
//! writes are serialized.

use crate::{migrations, queries, DatabaseError, DatabaseResult, HomeStore};
use homes_core::{Home, HomeId, HomeIndex, Location, SubjectId};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the database pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum connections in the pool.
    pub max_size: u32,
    /// Minimum idle connections to maintain.
    pub min_idle: Option<u32>,
    /// Connection acquisition timeout.
    pub connection_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone)]
pub struct PoolState {
    /// Total connections (active + idle).
    pub connections: u32,
    /// Currently idle connections.
    pub idle_connections: u32,
}

/// Thread-safe database connection pool.
pub struct DatabasePool {
    pool: Pool<SqliteConnectionManager>,
    path: String,
}

impl DatabasePool {
    /// Create a pool at the given path.
    ///
    /// Creates the file if needed, enables WAL, and runs pending migrations
    /// before returning.
    pub fn open(path: &Path, config: PoolConfig) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA temp_store = MEMORY;
                PRAGMA busy_timeout = 5000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        info!(
            path = %path_str,
            max_size = config.max_size,
            "Database pool created"
        );

        {
            let conn = pool
                .get()
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            migrations::run_migrations(&conn)?;
        }

        Ok(Self {
            pool,
            path: path_str,
        })
    }

    /// Get a connection from the pool, blocking up to the configured timeout.
    pub fn get(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }

    /// Get pool statistics for monitoring.
    pub fn state(&self) -> PoolState {
        let state = self.pool.state();
        PoolState {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Acquire and release a connection.
    pub fn health_check(&self) -> DatabaseResult<()> {
        let conn = self.get()?;
        conn.execute_batch("SELECT 1")?;
        debug!("Database pool health check passed");
        Ok(())
    }
}

impl HomeStore for DatabasePool {
    fn get_home_by_owner_and_name(
        &self,
        owner: SubjectId,
        name: &str,
    ) -> DatabaseResult<Option<Home>> {
        let conn = self.get()?;
        queries::get_home_by_owner_and_name(&conn, owner, name)
    }

    fn get_home_by_id(&self, home_id: HomeId) -> DatabaseResult<Option<Home>> {
        let conn = self.get()?;
        queries::get_home_by_id(&conn, home_id)
    }

    fn get_homes_by_owner(&self, owner: SubjectId) -> DatabaseResult<HashMap<String, Location>> {
        let conn = self.get()?;
        queries::get_homes_by_owner(&conn, owner)
    }

    fn get_owner_home_index(&self, owner: SubjectId) -> DatabaseResult<HomeIndex> {
        let conn = self.get()?;
        queries::get_owner_home_index(&conn, owner)
    }

    fn insert_home(
        &self,
        owner: SubjectId,
        name: &str,
        location: &Location,
    ) -> DatabaseResult<bool> {
        let conn = self.get()?;
        queries::insert_home(&conn, owner, name, location)
    }

    fn upsert_home(
        &self,
        owner: SubjectId,
        name: &str,
        location: &Location,
    ) -> DatabaseResult<bool> {
        let conn = self.get()?;
        queries::upsert_home(&conn, owner, name, location)
    }

    fn update_home_by_id(&self, home_id: HomeId, location: &Location) -> DatabaseResult<bool> {
        let conn = self.get()?;
        queries::update_home_by_id(&conn, home_id, location)
    }

    fn delete_home_by_owner_and_name(&self, owner: SubjectId, name: &str) -> DatabaseResult<bool> {
        let conn = self.get()?;
        queries::delete_home_by_owner_and_name(&conn, owner, name)
    }

    fn delete_home_by_id(&self, home_id: HomeId) -> DatabaseResult<bool> {
        let conn = self.get()?;
        queries::delete_home_by_id(&conn, home_id)
    }

    fn register_identity(&self, id: SubjectId, display_name: &str) -> DatabaseResult<()> {
        let conn = self.get()?;
        queries::register_identity(&conn, id, display_name)
    }

    fn get_display_name(&self, id: SubjectId) -> DatabaseResult<Option<String>> {
        let conn = self.get()?;
        queries::get_display_name(&conn, id)
    }

    fn get_stable_ids(&self, display_name: &str) -> DatabaseResult<Vec<SubjectId>> {
        let conn = self.get()?;
        queries::get_stable_ids(&conn, display_name)
    }
}
