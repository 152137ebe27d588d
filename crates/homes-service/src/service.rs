//! The resolution service.

use crate::cache::LoadingCache;
use crate::completion::possible_completions;
use crate::{HomeError, HomeResult};
use homes_config_and_utils::{Config, DEFAULT_HOME};
use homes_core::{
    Home, HomeId, HomeIndex, HomeTarget, Location, Subject, SubjectId, MAX_USERNAME_LENGTH,
};
use homes_database::{DatabaseError, HomeStore};
use homes_executor::BackgroundExecutor;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Why a cache load produced no value.
#[derive(Debug, Clone)]
enum LoadError {
    Missing,
    Storage(Arc<DatabaseError>),
}

impl LoadError {
    fn into_home_error(self, target: &HomeTarget) -> HomeError {
        HomeError::NotFound {
            target: target.to_human_readable(),
            source: match self {
                LoadError::Missing => None,
                LoadError::Storage(e) => Some(e),
            },
        }
    }
}

/// Settings the service needs from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    /// Stamped onto every location written through this service.
    pub server_name: String,
    pub default_home: String,
    pub cache_ttl: Duration,
}

impl ServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            server_name: config.server_name.clone(),
            default_home: config.default_home.clone(),
            cache_ttl: config.cache_ttl(),
        }
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            server_name: String::new(),
            default_home: DEFAULT_HOME.to_string(),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Resolves, writes and deletes homes through three expiring caches.
///
/// Blocking methods must run on a Background thread. The `*_non_blocking`
/// methods and [`HomesService::complete`] only read caches and are safe on
/// the Controlling thread.
pub struct HomesService {
    store: Arc<dyn HomeStore>,
    background: BackgroundExecutor,
    options: ServiceOptions,
    locations: Arc<LoadingCache<HomeId, Home, LoadError>>,
    owner_indices: Arc<LoadingCache<SubjectId, HomeIndex, LoadError>>,
    identities: Arc<LoadingCache<String, Vec<SubjectId>, LoadError>>,
}

impl HomesService {
    pub fn new(
        store: Arc<dyn HomeStore>,
        background: BackgroundExecutor,
        options: ServiceOptions,
    ) -> Self {
        let ttl = options.cache_ttl;

        let locations = {
            let store = Arc::clone(&store);
            LoadingCache::new(ttl, move |home_id: &HomeId| {
                match store.get_home_by_id(*home_id) {
                    Ok(Some(home)) => Ok(home),
                    Ok(None) => Err(LoadError::Missing),
                    Err(e) => {
                        error!(home_id, error = %e, "Failed to load home");
                        Err(LoadError::Storage(Arc::new(e)))
                    }
                }
            })
        };

        let owner_indices = {
            let store = Arc::clone(&store);
            LoadingCache::new(ttl, move |owner: &SubjectId| {
                store.get_owner_home_index(*owner).map_err(|e| {
                    error!(%owner, error = %e, "Failed to load home index");
                    LoadError::Storage(Arc::new(e))
                })
            })
        };

        let identities = {
            let store = Arc::clone(&store);
            LoadingCache::new(ttl, move |name_key: &String| {
                store.get_stable_ids(name_key).map_err(|e| {
                    error!(name = %name_key, error = %e, "Failed to look up player ids");
                    LoadError::Storage(Arc::new(e))
                })
            })
        };

        Self {
            store,
            background,
            options,
            locations: Arc::new(locations),
            owner_indices: Arc::new(owner_indices),
            identities: Arc::new(identities),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.options.server_name
    }

    pub fn default_home(&self) -> &str {
        &self.options.default_home
    }

    // ==========================================
    // Resolution
    // ==========================================

    /// The single identity registered under `owner_name`.
    pub fn resolve_owner(&self, owner_name: &str) -> HomeResult<SubjectId> {
        let ids = self
            .identities
            .get(&owner_name.to_ascii_lowercase())
            .map_err(|e| match e {
                LoadError::Missing => HomeError::UnknownOwner(owner_name.to_string()),
                LoadError::Storage(source) => HomeError::NotFound {
                    target: owner_name.to_string(),
                    source: Some(source),
                },
            })?;
        match ids.as_slice() {
            [] => Err(HomeError::UnknownOwner(owner_name.to_string())),
            [id] => Ok(*id),
            _ => Err(HomeError::Ambiguous(owner_name.to_string())),
        }
    }

    /// The owner and home name a name-bearing target refers to.
    fn owner_and_name<'t>(
        &self,
        target: &'t HomeTarget,
        acting: Option<&Subject>,
    ) -> HomeResult<Option<(SubjectId, &'t str)>> {
        match target {
            HomeTarget::Identifier(_) => Ok(None),
            HomeTarget::OwnName(name) => match acting {
                Some(subject) => Ok(Some((subject.id, name.as_str()))),
                None => Err(HomeError::Unsupported(target.to_human_readable())),
            },
            HomeTarget::ForeignName { owner, name } => {
                Ok(Some((self.resolve_owner(owner)?, name.as_str())))
            }
            HomeTarget::ForeignNameUnique { owner, name } => Ok(Some((*owner, name.as_str()))),
        }
    }

    /// The storage id of the home `target` refers to.
    ///
    /// Identifiers are returned as-is without a storage round trip.
    pub fn resolve_home_id(
        &self,
        target: &HomeTarget,
        acting: Option<&Subject>,
    ) -> HomeResult<HomeId> {
        if let HomeTarget::Identifier(home_id) = target {
            return Ok(*home_id);
        }
        let Some((owner, name)) = self.owner_and_name(target, acting)? else {
            return Err(HomeError::not_found(target.to_human_readable()));
        };
        let index = self
            .owner_indices
            .get(&owner)
            .map_err(|e| e.into_home_error(target))?;
        index
            .id_of(name)
            .ok_or_else(|| HomeError::not_found(target.to_human_readable()))
    }

    /// The full home `target` refers to.
    pub fn resolve_home(&self, target: &HomeTarget, acting: Option<&Subject>) -> HomeResult<Home> {
        let home_id = self.resolve_home_id(target, acting)?;
        self.locations
            .get(&home_id)
            .map_err(|e| e.into_home_error(target))
    }

    pub fn resolve_location(
        &self,
        target: &HomeTarget,
        acting: Option<&Subject>,
    ) -> HomeResult<Location> {
        self.resolve_home(target, acting).map(|home| home.location)
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Write `location` for `target`, stamped with this server's name.
    ///
    /// Identifiers move an existing home and ignore `allow_override`. Names
    /// insert a new home, or overwrite an existing one when `allow_override`
    /// is set. Storage faults are logged and reported as `Ok(false)`.
    pub fn set_location(
        &self,
        target: &HomeTarget,
        acting: &Subject,
        location: Location,
        allow_override: bool,
    ) -> HomeResult<bool> {
        let location = location.on_server(self.options.server_name.clone());

        if let HomeTarget::Identifier(home_id) = target {
            return Ok(match self.store.update_home_by_id(*home_id, &location) {
                Ok(updated) => {
                    if updated {
                        self.locations.invalidate(home_id);
                    }
                    updated
                }
                Err(e) => {
                    error!(home_id, error = %e, "Failed to update home");
                    false
                }
            });
        }

        let Some((owner, name)) = self.owner_and_name(target, Some(acting))? else {
            return Ok(false);
        };

        let written = if allow_override {
            self.store.upsert_home(owner, name, &location)
        } else {
            self.store.insert_home(owner, name, &location)
        };

        match written {
            Ok(true) => {
                self.owner_indices.invalidate(&owner);
                if let Ok(index) = self.owner_indices.get(&owner) {
                    if let Some(home_id) = index.id_of(name) {
                        self.locations.invalidate(&home_id);
                    }
                }
                info!(%owner, name, override_existing = allow_override, "Home set");
                Ok(true)
            }
            Ok(false) => {
                debug!(%owner, name, "Home not written");
                Ok(false)
            }
            Err(e) => {
                error!(%owner, name, error = %e, "Failed to write home");
                Ok(false)
            }
        }
    }

    /// Delete the home `target` refers to. Storage faults are logged and
    /// reported as `Ok(false)`.
    pub fn delete_location(&self, target: &HomeTarget, acting: &Subject) -> HomeResult<bool> {
        if let HomeTarget::Identifier(home_id) = target {
            let owner = match self.locations.get_if_present(home_id) {
                Some(home) => Ok(Some(home.owner)),
                None => self
                    .store
                    .get_home_by_id(*home_id)
                    .map(|home| home.map(|home| home.owner)),
            };
            let deleted = self.store.delete_home_by_id(*home_id);
            self.locations.invalidate(home_id);
            match owner {
                Ok(Some(owner)) => self.owner_indices.invalidate(&owner),
                Ok(None) => {}
                Err(e) => {
                    // Owner unknown, so no single index entry can be trusted.
                    error!(home_id, error = %e, "Failed to look up owner of home");
                    self.owner_indices.invalidate_all();
                }
            }
            return Ok(self.log_delete(deleted, &target.to_human_readable()));
        }

        let Some((owner, name)) = self.owner_and_name(target, Some(acting))? else {
            return Ok(false);
        };

        let deleted = self.store.delete_home_by_owner_and_name(owner, name);
        if let Some(index) = self.owner_indices.get_if_present(&owner) {
            if let Some(home_id) = index.id_of(name) {
                self.locations.invalidate(&home_id);
            }
        }
        self.owner_indices.invalidate(&owner);
        Ok(self.log_delete(deleted, &target.to_human_readable()))
    }

    fn log_delete(&self, deleted: Result<bool, DatabaseError>, label: &str) -> bool {
        match deleted {
            Ok(true) => {
                info!(home = label, "Home deleted");
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!(home = label, error = %e, "Failed to delete home");
                false
            }
        }
    }

    // ==========================================
    // Listing
    // ==========================================

    /// Every home of `owner`, read straight from storage.
    pub fn list_homes(&self, owner: SubjectId) -> HomeResult<HashMap<String, Location>> {
        self.store.get_homes_by_owner(owner).map_err(|e| {
            error!(%owner, error = %e, "Failed to list homes");
            HomeError::NotFound {
                target: owner.to_string(),
                source: Some(Arc::new(e)),
            }
        })
    }

    /// Cached home names of `owner`.
    ///
    /// On a miss, schedules a background load and returns nothing.
    pub fn home_names_non_blocking(&self, owner: SubjectId) -> Vec<String> {
        if let Some(index) = self.owner_indices.get_if_present(&owner) {
            return index.names().map(str::to_string).collect();
        }
        let owner_indices = Arc::clone(&self.owner_indices);
        self.background.spawn(move || {
            let _ = owner_indices.get(&owner);
        });
        Vec::new()
    }

    /// Cached `owner:name` strings for a display name or a stable id.
    ///
    /// Arguments up to the username length limit are display names; longer
    /// ones are parsed as ids. A miss schedules the loads in the background
    /// and returns nothing; an ambiguous name returns nothing.
    pub fn list_home_names_non_blocking(&self, owner_or_username: &str) -> Vec<String> {
        let owner = if owner_or_username.chars().count() <= MAX_USERNAME_LENGTH {
            let key = owner_or_username.to_ascii_lowercase();
            match self.identities.get_if_present(&key) {
                Some(ids) if ids.len() == 1 => ids[0],
                Some(_) => return Vec::new(),
                None => {
                    let identities = Arc::clone(&self.identities);
                    let owner_indices = Arc::clone(&self.owner_indices);
                    self.background.spawn(move || {
                        if let Ok(ids) = identities.get(&key) {
                            if let [id] = ids.as_slice() {
                                let _ = owner_indices.get(id);
                            }
                        }
                    });
                    return Vec::new();
                }
            }
        } else {
            match owner_or_username.parse::<SubjectId>() {
                Ok(id) => id,
                Err(_) => return Vec::new(),
            }
        };

        self.home_names_non_blocking(owner)
            .into_iter()
            .map(|name| format!("{owner_or_username}:{name}"))
            .collect()
    }

    /// Completion candidates for a partially typed target.
    ///
    /// With `allow_foreign` and a `:` in the argument, candidates are the
    /// named owner's homes; otherwise the acting subject's own.
    pub fn complete(
        &self,
        argument: &str,
        acting: Option<&Subject>,
        allow_foreign: bool,
    ) -> Vec<String> {
        if allow_foreign {
            if let Some((owner, _)) = argument.split_once(':') {
                return possible_completions(argument, self.list_home_names_non_blocking(owner));
            }
        }
        match acting {
            Some(subject) => possible_completions(argument, self.home_names_non_blocking(subject.id)),
            None => Vec::new(),
        }
    }

    // ==========================================
    // Identities and sessions
    // ==========================================

    /// Record `subject`'s current display name. `false` on storage fault.
    pub fn register_identity(&self, subject: &Subject) -> bool {
        let registered = match self.store.register_identity(subject.id, &subject.name) {
            Ok(()) => true,
            Err(e) => {
                error!(subject = %subject, error = %e, "Failed to register player");
                false
            }
        };
        self.forget_subject(subject);
        registered
    }

    /// Connect boundary: register and drop cached lookups for `subject`.
    pub fn on_subject_connect(&self, subject: &Subject) {
        self.register_identity(subject);
    }

    /// Disconnect boundary: drop cached lookups for `subject`.
    pub fn on_subject_disconnect(&self, subject: &Subject) {
        self.forget_subject(subject);
    }

    fn forget_subject(&self, subject: &Subject) {
        self.owner_indices.invalidate(&subject.id);
        self.identities.invalidate(&subject.name_key());
    }

    // ==========================================
    // Maintenance
    // ==========================================

    /// Sweep expired entries from every cache.
    pub fn cleanup(&self) -> usize {
        self.locations.cleanup() + self.owner_indices.cleanup() + self.identities.cleanup()
    }

    pub fn invalidate_all(&self) {
        self.locations.invalidate_all();
        self.owner_indices.invalidate_all();
        self.identities.invalidate_all();
    }
}
