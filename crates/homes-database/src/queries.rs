//! Standalone query functions that work with any Connection.
//!
//! Both [`crate::Database`] and [`crate::DatabasePool`] delegate here, so a
//! single connection and a pooled one behave identically.

use crate::{DatabaseError, DatabaseResult};
use homes_core::{Home, HomeId, HomeIndex, Location, SubjectId};
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

const HOME_COLUMNS: &str = "home_id, owner_id, name, server, world, x, y, z, yaw, pitch";

fn subject_from_blob(blob: Vec<u8>) -> DatabaseResult<SubjectId> {
    Uuid::from_slice(&blob)
        .map(SubjectId::from)
        .map_err(|e| DatabaseError::InvalidData(format!("stored identity is not a UUID: {e}")))
}

/// Raw home row; the owner blob is validated after the row is read.
struct HomeRow {
    home_id: HomeId,
    owner: Vec<u8>,
    name: String,
    location: Location,
}

impl HomeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            home_id: row.get(0)?,
            owner: row.get(1)?,
            name: row.get(2)?,
            location: Location {
                server: row.get(3)?,
                world: row.get(4)?,
                x: row.get(5)?,
                y: row.get(6)?,
                z: row.get(7)?,
                yaw: row.get::<_, f64>(8)? as f32,
                pitch: row.get::<_, f64>(9)? as f32,
            },
        })
    }

    fn into_home(self) -> DatabaseResult<Home> {
        Ok(Home {
            home_id: self.home_id,
            owner: subject_from_blob(self.owner)?,
            name: self.name,
            location: self.location,
        })
    }
}

fn single_home(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> DatabaseResult<Option<Home>> {
    let mut stmt = conn.prepare_cached(sql)?;
    match stmt.query_row(params, HomeRow::from_row) {
        Ok(row) => row.into_home().map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ==========================================
// Homes
// ==========================================

/// Get a home by owner and (case-insensitive) name.
pub fn get_home_by_owner_and_name(
    conn: &Connection,
    owner: SubjectId,
    name: &str,
) -> DatabaseResult<Option<Home>> {
    single_home(
        conn,
        &format!("SELECT {HOME_COLUMNS} FROM homes WHERE owner_id = ?1 AND name = ?2"),
        params![owner.as_bytes().as_slice(), name],
    )
}

/// Get a home by id.
pub fn get_home_by_id(conn: &Connection, home_id: HomeId) -> DatabaseResult<Option<Home>> {
    single_home(
        conn,
        &format!("SELECT {HOME_COLUMNS} FROM homes WHERE home_id = ?1"),
        params![home_id],
    )
}

/// All homes of an owner keyed by name.
pub fn get_homes_by_owner(
    conn: &Connection,
    owner: SubjectId,
) -> DatabaseResult<HashMap<String, Location>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {HOME_COLUMNS} FROM homes WHERE owner_id = ?1 ORDER BY home_id"
    ))?;
    let rows = stmt
        .query_map(params![owner.as_bytes().as_slice()], HomeRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|row| (row.name, row.location)).collect())
}

/// The id/name index of an owner's homes.
pub fn get_owner_home_index(conn: &Connection, owner: SubjectId) -> DatabaseResult<HomeIndex> {
    let mut stmt =
        conn.prepare_cached("SELECT home_id, name FROM homes WHERE owner_id = ?1 ORDER BY home_id")?;
    let rows = stmt
        .query_map(params![owner.as_bytes().as_slice()], |row| {
            Ok((row.get::<_, HomeId>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().collect())
}

/// Insert a home. Returns `false` if the name is taken or the owner is unknown.
pub fn insert_home(
    conn: &Connection,
    owner: SubjectId,
    name: &str,
    location: &Location,
) -> DatabaseResult<bool> {
    let changed = conn.execute(
        "INSERT INTO homes (owner_id, name, server, world, x, y, z, yaw, pitch)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
         WHERE EXISTS (SELECT 1 FROM players WHERE unique_id = ?1)
         ON CONFLICT (owner_id, name) DO NOTHING",
        params![
            owner.as_bytes().as_slice(),
            name,
            location.server,
            location.world,
            location.x,
            location.y,
            location.z,
            f64::from(location.yaw),
            f64::from(location.pitch),
        ],
    )?;
    debug!(%owner, name, inserted = changed > 0, "insert_home");
    Ok(changed > 0)
}

/// Insert or overwrite a home. Returns `false` if the owner is unknown.
pub fn upsert_home(
    conn: &Connection,
    owner: SubjectId,
    name: &str,
    location: &Location,
) -> DatabaseResult<bool> {
    let changed = conn.execute(
        "INSERT INTO homes (owner_id, name, server, world, x, y, z, yaw, pitch)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
         WHERE EXISTS (SELECT 1 FROM players WHERE unique_id = ?1)
         ON CONFLICT (owner_id, name) DO UPDATE SET
            server = excluded.server,
            world = excluded.world,
            x = excluded.x,
            y = excluded.y,
            z = excluded.z,
            yaw = excluded.yaw,
            pitch = excluded.pitch",
        params![
            owner.as_bytes().as_slice(),
            name,
            location.server,
            location.world,
            location.x,
            location.y,
            location.z,
            f64::from(location.yaw),
            f64::from(location.pitch),
        ],
    )?;
    debug!(%owner, name, written = changed > 0, "upsert_home");
    Ok(changed > 0)
}

/// Move an existing home.
pub fn update_home_by_id(
    conn: &Connection,
    home_id: HomeId,
    location: &Location,
) -> DatabaseResult<bool> {
    let changed = conn.execute(
        "UPDATE homes SET server = ?2, world = ?3, x = ?4, y = ?5, z = ?6, yaw = ?7, pitch = ?8
         WHERE home_id = ?1",
        params![
            home_id,
            location.server,
            location.world,
            location.x,
            location.y,
            location.z,
            f64::from(location.yaw),
            f64::from(location.pitch),
        ],
    )?;
    Ok(changed > 0)
}

/// Delete a home by owner and name.
pub fn delete_home_by_owner_and_name(
    conn: &Connection,
    owner: SubjectId,
    name: &str,
) -> DatabaseResult<bool> {
    let changed = conn.execute(
        "DELETE FROM homes WHERE owner_id = ?1 AND name = ?2",
        params![owner.as_bytes().as_slice(), name],
    )?;
    Ok(changed > 0)
}

/// Delete a home by id.
pub fn delete_home_by_id(conn: &Connection, home_id: HomeId) -> DatabaseResult<bool> {
    let changed = conn.execute("DELETE FROM homes WHERE home_id = ?1", params![home_id])?;
    Ok(changed > 0)
}

// ==========================================
// Identities
// ==========================================

/// Register an identity, or rename it if it already exists.
pub fn register_identity(
    conn: &Connection,
    id: SubjectId,
    display_name: &str,
) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO players (unique_id, username) VALUES (?1, ?2)
         ON CONFLICT (unique_id) DO UPDATE SET username = excluded.username",
        params![id.as_bytes().as_slice(), display_name],
    )?;
    debug!(%id, display_name, "Identity registered");
    Ok(())
}

/// Current display name of an identity.
pub fn get_display_name(conn: &Connection, id: SubjectId) -> DatabaseResult<Option<String>> {
    let mut stmt = conn.prepare_cached("SELECT username FROM players WHERE unique_id = ?1")?;
    match stmt.query_row(params![id.as_bytes().as_slice()], |row| row.get(0)) {
        Ok(name) => Ok(Some(name)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All identities registered under a display name, case-insensitively.
pub fn get_stable_ids(conn: &Connection, display_name: &str) -> DatabaseResult<Vec<SubjectId>> {
    let mut stmt =
        conn.prepare_cached("SELECT unique_id FROM players WHERE username = ?1 ORDER BY rowid")?;
    let blobs = stmt
        .query_map(params![display_name], |row| row.get::<_, Vec<u8>>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    blobs.into_iter().map(subject_from_blob).collect()
}
