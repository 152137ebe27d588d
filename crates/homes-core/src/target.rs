//! Home targets: what a user means when they type a home reference.
//!
//! Grammar:
//!
//! ```text
//! @<digits>            -> Identifier
//! <name>               -> OwnName
//! <owner>:<name>       -> ForeignName        (owner is at most 16 chars)
//! <uuid>:<name>        -> ForeignNameUnique  (anything longer must be a UUID)
//! ```
//!
//! Only the first `:` splits, so home names may contain colons.

use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::{HomeId, SubjectId};

/// Display names longer than this are treated as stable ids.
pub const MAX_USERNAME_LENGTH: usize = 16;

/// Why a raw string is not a home target.
///
/// Unparseable input is an expected user mistake, distinct from "not found".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetParseError {
    #[error("empty home target")]
    Empty,

    #[error("'{0}' is not a valid home identifier")]
    InvalidIdentifier(String),

    #[error("missing owner before ':' in '{0}'")]
    EmptyOwner(String),

    #[error("missing home name after ':' in '{0}'")]
    EmptyName(String),

    #[error("'{0}' is neither a username nor a unique id")]
    InvalidOwnerId(String),
}

/// A parsed reference to a home.
#[derive(Debug, Clone, Eq)]
pub enum HomeTarget {
    /// A storage row, resolvable without knowing the owner.
    Identifier(HomeId),
    /// One of the acting subject's own homes.
    OwnName(String),
    /// Another subject's home, owner given by display name.
    ForeignName { owner: String, name: String },
    /// Another subject's home, owner given by stable id.
    ForeignNameUnique { owner: SubjectId, name: String },
}

impl HomeTarget {
    /// Parses a raw user-supplied string.
    pub fn parse(raw: &str) -> Result<Self, TargetParseError> {
        if raw.is_empty() {
            return Err(TargetParseError::Empty);
        }

        if let Some(digits) = raw.strip_prefix('@') {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(TargetParseError::InvalidIdentifier(raw.to_string()));
            }
            return digits
                .parse::<HomeId>()
                .map(HomeTarget::Identifier)
                .map_err(|_| TargetParseError::InvalidIdentifier(raw.to_string()));
        }

        let Some((owner, name)) = raw.split_once(':') else {
            return Ok(HomeTarget::OwnName(raw.to_string()));
        };

        if owner.is_empty() {
            return Err(TargetParseError::EmptyOwner(raw.to_string()));
        }
        if name.is_empty() {
            return Err(TargetParseError::EmptyName(raw.to_string()));
        }

        if owner.chars().count() <= MAX_USERNAME_LENGTH {
            return Ok(HomeTarget::ForeignName {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }

        owner
            .parse::<SubjectId>()
            .map(|owner| HomeTarget::ForeignNameUnique {
                owner,
                name: name.to_string(),
            })
            .map_err(|_| TargetParseError::InvalidOwnerId(owner.to_string()))
    }

    /// Renders the target the way a user would type it.
    pub fn to_human_readable(&self) -> String {
        match self {
            HomeTarget::Identifier(id) => format!("@{id}"),
            HomeTarget::OwnName(name) => name.clone(),
            HomeTarget::ForeignName { owner, name } => format!("{owner}:{name}"),
            HomeTarget::ForeignNameUnique { owner, name } => format!("{owner}:{name}"),
        }
    }

    /// Whether the target can be resolved without an acting subject.
    pub fn is_foreign(&self) -> bool {
        !matches!(self, HomeTarget::OwnName(_))
    }

    /// The home name, for name-bearing variants.
    pub fn name(&self) -> Option<&str> {
        match self {
            HomeTarget::Identifier(_) => None,
            HomeTarget::OwnName(name)
            | HomeTarget::ForeignName { name, .. }
            | HomeTarget::ForeignNameUnique { name, .. } => Some(name),
        }
    }

    /// The owner display name of a `ForeignName` target.
    pub fn owner_name(&self) -> Option<&str> {
        match self {
            HomeTarget::ForeignName { owner, .. } => Some(owner),
            _ => None,
        }
    }
}

impl std::str::FromStr for HomeTarget {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HomeTarget::parse(s)
    }
}

impl std::fmt::Display for HomeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_human_readable())
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl PartialEq for HomeTarget {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HomeTarget::Identifier(a), HomeTarget::Identifier(b)) => a == b,
            (HomeTarget::OwnName(a), HomeTarget::OwnName(b)) => eq_ignore_case(a, b),
            (
                HomeTarget::ForeignName { owner: oa, name: na },
                HomeTarget::ForeignName { owner: ob, name: nb },
            ) => eq_ignore_case(oa, ob) && eq_ignore_case(na, nb),
            (
                HomeTarget::ForeignNameUnique { owner: oa, name: na },
                HomeTarget::ForeignNameUnique { owner: ob, name: nb },
            ) => oa == ob && eq_ignore_case(na, nb),
            _ => false,
        }
    }
}

impl Hash for HomeTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            HomeTarget::Identifier(id) => id.hash(state),
            HomeTarget::OwnName(name) => name.to_ascii_lowercase().hash(state),
            HomeTarget::ForeignName { owner, name } => {
                owner.to_ascii_lowercase().hash(state);
                name.to_ascii_lowercase().hash(state);
            }
            HomeTarget::ForeignNameUnique { owner, name } => {
                owner.hash(state);
                name.to_ascii_lowercase().hash(state);
            }
        }
    }
}
