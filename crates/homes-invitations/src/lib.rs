//! Pending invitations to a location.
//!
//! [`InvitationRegistry`] indexes every invitation twice, by sender and by
//! recipient, so either side can find or drop it. Expired entries are removed
//! when they are next looked at; nothing sweeps them in the background.

mod registry;

pub use registry::{InvitationRegistry, PendingInvitation, DEFAULT_INVITATION_TTL};
