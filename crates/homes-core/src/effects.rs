//! Visible side effects.
//!
//! The runtime never talks to players or moves them directly. It emits
//! [`Notice`]s through a [`Notifier`] and relocates through a [`Teleporter`];
//! the host decides what those mean.

use crate::{Location, Subject, SubjectId};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Why a home operation failed, without its storage cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HomeFailure {
    #[error("home '{0}' not found")]
    NotFound(String),
    #[error("player '{0}' can't be uniquely identified")]
    Ambiguous(String),
    #[error("player '{0}' is not registered")]
    UnknownOwner(String),
    #[error("home '{0}' can't be resolved without a player")]
    Unsupported(String),
}

/// A message for one subject.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The raw target could not be parsed.
    Unparseable(String),
    /// Resolution or a write failed.
    Failed(HomeFailure),
    /// The home exists but lives on another server.
    WrongServer { target: String, server: String },

    /// A delayed relocation was started.
    TeleportScheduled { delay: Duration },
    /// A pending relocation was replaced by a newer one.
    Superseded,
    /// A pending relocation was dropped because the subject moved.
    CancelledByMove,

    HomeSet { target: String },
    /// The insert was refused, most likely because the name is taken.
    HomeExists { target: String },
    /// A write was refused for another reason.
    HomeNotSet { target: String },
    HomeDeleted { target: String },
    NothingDeleted { target: String },
    /// Homes of `owner`, sorted by name.
    HomeList {
        owner: String,
        homes: Vec<(String, Location)>,
    },

    InvitationSent { recipient: String, expires_in: Duration },
    InvitationReceived { sender: String },
    AlreadyInvited { recipient: String },
    CannotInviteSelf,
    /// To the sender: `by` accepted.
    InvitationAccepted { by: String },
    /// To the sender: `by` declined.
    InvitationDeclined { by: String },
    /// To the recipient: confirmation of their decline.
    InvitationDismissed { sender: String },
    /// To the recipient: nothing to accept or decline.
    InvitationMissing { sender: String },
}

/// Delivers notices to subjects.
pub trait Notifier: Send + Sync {
    fn notify(&self, to: &Subject, notice: Notice);
}

/// Moves subjects.
pub trait Teleporter: Send + Sync {
    fn teleport(&self, subject: &Subject, destination: &Location);
}

/// A notifier that discards everything.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _to: &Subject, _notice: Notice) {}
}

/// A notifier that records every notice for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(SubjectId, Notice)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded notices in emission order.
    pub fn notices(&self) -> Vec<(SubjectId, Notice)> {
        self.notices.lock().expect("lock poisoned").clone()
    }

    /// Notices sent to one subject.
    pub fn notices_for(&self, subject: SubjectId) -> Vec<Notice> {
        self.notices
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|(to, _)| *to == subject)
            .map(|(_, notice)| notice.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.notices.lock().expect("lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.notices.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, to: &Subject, notice: Notice) {
        self.notices
            .lock()
            .expect("lock poisoned")
            .push((to.id, notice));
    }
}

/// A teleporter that records every relocation for tests.
#[derive(Debug, Default)]
pub struct RecordingTeleporter {
    teleports: Mutex<Vec<(SubjectId, Location)>>,
}

impl RecordingTeleporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn teleports(&self) -> Vec<(SubjectId, Location)> {
        self.teleports.lock().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.teleports.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Teleporter for RecordingTeleporter {
    fn teleport(&self, subject: &Subject, destination: &Location) {
        self.teleports
            .lock()
            .expect("lock poisoned")
            .push((subject.id, destination.clone()));
    }
}
