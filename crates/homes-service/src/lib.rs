//! Home resolution and caching.
//!
//! [`HomesService`] turns [`homes_core::HomeTarget`]s into locations, writes
//! and deletes homes, and keeps three expiring caches in front of the
//! [`homes_database::HomeStore`]:
//! - home id to home
//! - owner id to that owner's home index
//! - lower-cased display name to the ids registered under it
//!
//! Every blocking method belongs on a Background thread.

mod cache;
mod completion;
mod error;
mod service;

pub use cache::LoadingCache;
pub use completion::possible_completions;
pub use error::{HomeError, HomeResult};
pub use homes_core::HomeFailure;
pub use service::{HomesService, ServiceOptions};
