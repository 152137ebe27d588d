//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_initial_schema(conn)?;
    }
    if current_version < 2 {
        migrate_v2_username_index(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: players and homes.
///
/// Names compare case-insensitively, so `(owner_id, name)` uniqueness and
/// username lookups ignore case.
fn migrate_v1_initial_schema(conn: &Connection) -> DatabaseResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS players (
            unique_id BLOB NOT NULL PRIMARY KEY CHECK (length(unique_id) = 16),
            username TEXT NOT NULL COLLATE NOCASE
        );

        CREATE TABLE IF NOT EXISTS homes (
            home_id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id BLOB NOT NULL REFERENCES players(unique_id) ON DELETE CASCADE,
            name TEXT NOT NULL COLLATE NOCASE,
            server TEXT NOT NULL,
            world TEXT NOT NULL,
            x REAL NOT NULL,
            y REAL NOT NULL,
            z REAL NOT NULL,
            yaw REAL NOT NULL,
            pitch REAL NOT NULL,
            UNIQUE (owner_id, name)
        );
        ",
    )?;
    record_migration(conn, 1, "initial_schema")
}

/// V2: index for display-name lookups.
fn migrate_v2_username_index(conn: &Connection) -> DatabaseResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_players_username ON players(username);",
    )?;
    record_migration(conn, 2, "username_index")
}
