//! Single-connection database.

use crate::{migrations, queries, DatabaseError, DatabaseResult, HomeStore};
use homes_core::{Home, HomeId, HomeIndex, Location, SubjectId};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// One SQLite connection guarded by a mutex.
///
/// Calls are serialized. Use [`crate::DatabasePool`] when several background
/// threads should read concurrently.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open a database at the given path, running migrations if needed.
    pub fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()?;
        // WAL does not apply to in-memory databases
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the underlying connection.
    pub fn connection(&self) -> DatabaseResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError::Connection("connection lock poisoned".to_string()))
    }
}

impl HomeStore for Database {
    fn get_home_by_owner_and_name(
        &self,
        owner: SubjectId,
        name: &str,
    ) -> DatabaseResult<Option<Home>> {
        queries::get_home_by_owner_and_name(&*self.connection()?, owner, name)
    }

    fn get_home_by_id(&self, home_id: HomeId) -> DatabaseResult<Option<Home>> {
        queries::get_home_by_id(&*self.connection()?, home_id)
    }

    fn get_homes_by_owner(&self, owner: SubjectId) -> DatabaseResult<HashMap<String, Location>> {
        queries::get_homes_by_owner(&*self.connection()?, owner)
    }

    fn get_owner_home_index(&self, owner: SubjectId) -> DatabaseResult<HomeIndex> {
        queries::get_owner_home_index(&*self.connection()?, owner)
    }

    fn insert_home(
        &self,
        owner: SubjectId,
        name: &str,
        location: &Location,
    ) -> DatabaseResult<bool> {
        queries::insert_home(&*self.connection()?, owner, name, location)
    }

    fn upsert_home(
        &self,
        owner: SubjectId,
        name: &str,
        location: &Location,
    ) -> DatabaseResult<bool> {
        queries::upsert_home(&*self.connection()?, owner, name, location)
    }

    fn update_home_by_id(&self, home_id: HomeId, location: &Location) -> DatabaseResult<bool> {
        queries::update_home_by_id(&*self.connection()?, home_id, location)
    }

    fn delete_home_by_owner_and_name(&self, owner: SubjectId, name: &str) -> DatabaseResult<bool> {
        queries::delete_home_by_owner_and_name(&*self.connection()?, owner, name)
    }

    fn delete_home_by_id(&self, home_id: HomeId) -> DatabaseResult<bool> {
        queries::delete_home_by_id(&*self.connection()?, home_id)
    }

    fn register_identity(&self, id: SubjectId, display_name: &str) -> DatabaseResult<()> {
        queries::register_identity(&*self.connection()?, id, display_name)
    }

    fn get_display_name(&self, id: SubjectId) -> DatabaseResult<Option<String>> {
        queries::get_display_name(&*self.connection()?, id)
    }

    fn get_stable_ids(&self, display_name: &str) -> DatabaseResult<Vec<SubjectId>> {
        queries::get_stable_ids(&*self.connection()?, display_name)
    }
}
