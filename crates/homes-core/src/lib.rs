//! Core value types for the homes workspace.
//!
//! Everything here is a plain value, apart from the effect traits and their
//! recording implementations used by tests.
//!
//! - [`SubjectId`] / [`Subject`] - stable identity and display name of a user
//! - [`Location`] - a concrete position in a world on a server
//! - [`Home`] / [`HomeIndex`] - stored home records and the per-owner id/name index
//! - [`HomeTarget`] - a parsed, user-supplied reference to a home
//! - [`Notice`] / [`Notifier`] / [`Teleporter`] - visible side effects

mod effects;
mod home;
mod ids;
mod location;
mod target;

pub use effects::{
    HomeFailure, Notice, Notifier, NullNotifier, RecordingNotifier, RecordingTeleporter,
    Teleporter,
};
pub use home::{Home, HomeId, HomeIndex};
pub use ids::{Subject, SubjectId};
pub use location::Location;
pub use target::{HomeTarget, TargetParseError, MAX_USERNAME_LENGTH};
