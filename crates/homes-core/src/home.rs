//! Stored home records and the per-owner index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Location, SubjectId};

/// Storage row identifier of a home. Stable across renames and moves.
pub type HomeId = i32;

/// A home record as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Home {
    pub home_id: HomeId,
    pub owner: SubjectId,
    pub name: String,
    pub location: Location,
}

/// Bidirectional `home_id <-> name` map of one owner's homes.
///
/// Name lookups ignore ASCII case, matching the store's `NOCASE` collation;
/// the stored spelling is kept for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeIndex {
    by_id: HashMap<HomeId, String>,
    by_name: HashMap<String, HomeId>,
}

impl HomeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pair, evicting any pair that shares either side.
    pub fn insert(&mut self, home_id: HomeId, name: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        if let Some(previous_name) = self.by_id.remove(&home_id) {
            self.by_name.remove(&previous_name.to_ascii_lowercase());
        }
        if let Some(previous_id) = self.by_name.remove(&key) {
            self.by_id.remove(&previous_id);
        }
        self.by_name.insert(key, home_id);
        self.by_id.insert(home_id, name);
    }

    /// Looks up the id of a home by name.
    pub fn id_of(&self, name: &str) -> Option<HomeId> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Looks up the name of a home by id.
    pub fn name_of(&self, home_id: HomeId) -> Option<&str> {
        self.by_id.get(&home_id).map(String::as_str)
    }

    /// Home names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_id.values().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HomeId, &str)> {
        self.by_id.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl FromIterator<(HomeId, String)> for HomeIndex {
    fn from_iter<I: IntoIterator<Item = (HomeId, String)>>(iter: I) -> Self {
        let mut index = HomeIndex::new();
        for (home_id, name) in iter {
            index.insert(home_id, name);
        }
        index
    }
}
