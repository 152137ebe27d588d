//! Scenario tests for the homes runtime.
//!
//! - `homes.rs`       - setting, deleting and listing homes
//! - `teleport.rs`    - delayed, instant, cancelled and refused teleports
//! - `invitations.rs` - invite, accept, decline and expiry
//! - `sessions.rs`    - connect/disconnect hooks and lifecycle

mod homes;
mod teleport;

use crate::{HomesRuntime, RuntimeOptions};
use homes_core::{Location, Notice, RecordingNotifier, RecordingTeleporter, Subject, SubjectId};
use homes_database::Database;
use homes_service::ServiceOptions;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub(crate) const SERVER: &str = "lobby";
pub(crate) const DELAY: Duration = Duration::from_millis(50);

pub(crate) struct Fixture {
    pub runtime: HomesRuntime,
    pub store: Arc<Database>,
    pub notifier: Arc<RecordingNotifier>,
    pub teleporter: Arc<RecordingTeleporter>,
}

impl Fixture {
    /// Wait for queued effects and return what `subject` saw so far.
    pub fn seen(&self, subject: &Subject) -> Vec<Notice> {
        self.runtime.flush().unwrap();
        self.notifier.notices_for(subject.id)
    }

    /// Like [`Fixture::seen`], then forget every recorded notice.
    pub fn drain(&self, subject: &Subject) -> Vec<Notice> {
        self.runtime.flush().unwrap();
        let notices = self.notifier.notices_for(subject.id);
        self.notifier.clear();
        notices
    }
}

pub(crate) fn options() -> RuntimeOptions {
    RuntimeOptions {
        service: ServiceOptions {
            server_name: SERVER.into(),
            ..ServiceOptions::default()
        },
        invitation_ttl: Duration::from_secs(120),
        teleport_delay: DELAY,
    }
}

pub(crate) fn fixture_with(options: RuntimeOptions) -> Fixture {
    let store = Arc::new(Database::open_in_memory().unwrap());
    let notifier = Arc::new(RecordingNotifier::new());
    let teleporter = Arc::new(RecordingTeleporter::new());
    let runtime = HomesRuntime::with_store(
        store.clone(),
        options,
        teleporter.clone(),
        notifier.clone(),
    )
    .unwrap();
    Fixture {
        runtime,
        store,
        notifier,
        teleporter,
    }
}

/// A runtime with Steve and Alex connected.
pub(crate) fn fixture() -> Fixture {
    let f = fixture_with(options());
    f.runtime.on_subject_connect(&steve());
    f.runtime.on_subject_connect(&alex());
    f
}

pub(crate) fn steve() -> Subject {
    Subject::new(SubjectId::from_u128(1), "Steve")
}

pub(crate) fn alex() -> Subject {
    Subject::new(SubjectId::from_u128(2), "Alex")
}

/// A position as the host reports it, before any server is attached.
pub(crate) fn here(x: f64) -> Location {
    Location::new(x, 64.0, 0.0, 0.0, 0.0, "world", "")
}

/// The same position once saved on this server.
pub(crate) fn saved(x: f64) -> Location {
    here(x).on_server(SERVER)
}

pub(crate) fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Set a home, then teleport to it after the delay.
#[test]
fn basic_workflow() {
    let f = fixture();

    f.runtime.set_home(&steve(), Some("base"), here(10.0), false);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::HomeSet {
            target: "base".into()
        }]
    );

    f.runtime.teleport_home(&steve(), Some("base"), false);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::TeleportScheduled { delay: DELAY }]
    );
    assert!(eventually(|| f.teleporter.len() == 1));
    assert_eq!(f.teleporter.teleports(), vec![(steve().id, saved(10.0))]);
    assert!(!f.runtime.is_relocation_pending(steve().id));
}
