//! Storage contract.

use std::collections::HashMap;

use homes_core::{Home, HomeId, HomeIndex, Location, SubjectId};

use crate::DatabaseResult;

/// Blocking storage operations for homes and identities.
///
/// Display-name matching (`get_stable_ids`) is up to the implementation; the
/// SQLite stores in this crate match case-insensitively.
pub trait HomeStore: Send + Sync {
    /// Get a home by owner and name.
    fn get_home_by_owner_and_name(
        &self,
        owner: SubjectId,
        name: &str,
    ) -> DatabaseResult<Option<Home>>;

    /// Get a home by id.
    fn get_home_by_id(&self, home_id: HomeId) -> DatabaseResult<Option<Home>>;

    /// All homes of an owner, by name.
    fn get_homes_by_owner(&self, owner: SubjectId) -> DatabaseResult<HashMap<String, Location>>;

    /// The `home_id <-> name` index of an owner. Empty if the owner has no homes.
    fn get_owner_home_index(&self, owner: SubjectId) -> DatabaseResult<HomeIndex>;

    /// Insert a new home. `false` if the name is taken or the owner is not registered.
    fn insert_home(&self, owner: SubjectId, name: &str, location: &Location)
        -> DatabaseResult<bool>;

    /// Insert or update a home. `false` if the owner is not registered.
    fn upsert_home(&self, owner: SubjectId, name: &str, location: &Location)
        -> DatabaseResult<bool>;

    /// Move an existing home. `false` if no such id.
    fn update_home_by_id(&self, home_id: HomeId, location: &Location) -> DatabaseResult<bool>;

    /// Delete a home by owner and name. `false` if nothing was deleted.
    fn delete_home_by_owner_and_name(&self, owner: SubjectId, name: &str) -> DatabaseResult<bool>;

    /// Delete a home by id. `false` if nothing was deleted.
    fn delete_home_by_id(&self, home_id: HomeId) -> DatabaseResult<bool>;

    /// Register or rename an identity.
    fn register_identity(&self, id: SubjectId, display_name: &str) -> DatabaseResult<()>;

    /// Current display name of an identity.
    fn get_display_name(&self, id: SubjectId) -> DatabaseResult<Option<String>>;

    /// All identities currently registered under a display name.
    fn get_stable_ids(&self, display_name: &str) -> DatabaseResult<Vec<SubjectId>>;
}
