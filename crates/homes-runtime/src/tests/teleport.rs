//! Delayed, instant, cancelled and refused teleports.

use super::*;
use homes_core::HomeFailure;
use homes_database::HomeStore;

const SLOW: Duration = Duration::from_millis(300);

fn with_base(x: f64) -> Fixture {
    let f = fixture();
    f.runtime.set_home(&steve(), Some("base"), here(x), false);
    f.drain(&steve());
    f
}

/// Like `with_base`, with a delay long enough to act before it fires.
fn slow_with_base(x: f64) -> Fixture {
    let f = fixture_with(RuntimeOptions {
        teleport_delay: SLOW,
        ..options()
    });
    f.runtime.on_subject_connect(&steve());
    f.runtime.set_home(&steve(), Some("base"), here(x), false);
    f.drain(&steve());
    f
}

#[test]
fn instant_teleport_skips_the_delay_notice() {
    let f = with_base(4.0);
    f.runtime.teleport_home(&steve(), Some("base"), true);
    assert!(eventually(|| f.teleporter.len() == 1));
    assert_eq!(f.teleporter.teleports(), vec![(steve().id, saved(4.0))]);
    assert!(f.seen(&steve()).is_empty());
}

#[test]
fn teleport_to_default_home() {
    let f = fixture();
    f.runtime.set_home(&steve(), None, here(2.0), false);
    f.drain(&steve());

    f.runtime.teleport_home(&steve(), None, true);
    assert!(eventually(|| f.teleporter.len() == 1));
    assert_eq!(f.teleporter.teleports()[0].1, saved(2.0));
}

#[test]
fn teleport_to_someone_elses_home() {
    let f = with_base(4.0);
    f.runtime.teleport_home(&alex(), Some("Steve:base"), true);
    assert!(eventually(|| f.teleporter.len() == 1));
    assert_eq!(f.teleporter.teleports(), vec![(alex().id, saved(4.0))]);
}

#[test]
fn teleport_by_identifier() {
    let f = with_base(4.0);
    let home_id = f
        .runtime
        .service()
        .resolve_home_id(&homes_core::HomeTarget::OwnName("base".into()), Some(&steve()))
        .unwrap();

    f.runtime.teleport_home(&alex(), Some(&format!("@{home_id}")), true);
    assert!(eventually(|| f.teleporter.len() == 1));
    assert_eq!(f.teleporter.teleports()[0].1, saved(4.0));
}

#[test]
fn missing_home_is_reported() {
    let f = fixture();
    f.runtime.teleport_home(&steve(), Some("nowhere"), false);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::Failed(HomeFailure::NotFound("nowhere".into()))]
    );
    assert!(!f.runtime.is_relocation_pending(steve().id));
}

#[test]
fn home_on_another_server_is_refused() {
    let f = fixture();
    let elsewhere = here(1.0).on_server("creative");
    assert!(f.store.insert_home(steve().id, "far", &elsewhere).unwrap());

    f.runtime.teleport_home(&steve(), Some("far"), false);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::WrongServer {
            target: "far".into(),
            server: "creative".into(),
        }]
    );
    thread::sleep(DELAY * 3);
    assert!(f.teleporter.is_empty());
}

#[test]
fn moving_cancels_the_pending_teleport() {
    let f = slow_with_base(4.0);
    f.runtime.teleport_home(&steve(), Some("base"), false);
    f.runtime.on_subject_moved(&steve(), &here(0.0), &here(0.5));
    assert_eq!(
        f.drain(&steve()),
        vec![
            Notice::TeleportScheduled { delay: SLOW },
            Notice::CancelledByMove,
        ]
    );
    assert!(!f.runtime.is_relocation_pending(steve().id));
    thread::sleep(SLOW * 2);
    assert!(f.teleporter.is_empty());
}

#[test]
fn turning_on_the_spot_keeps_the_teleport() {
    let f = with_base(4.0);
    f.runtime.teleport_home(&steve(), Some("base"), false);

    let mut turned = here(0.0);
    turned.yaw = 90.0;
    turned.pitch = 30.0;
    f.runtime.on_subject_moved(&steve(), &here(0.0), &turned);

    assert!(eventually(|| f.teleporter.len() == 1));
    assert_eq!(
        f.seen(&steve()),
        vec![Notice::TeleportScheduled { delay: DELAY }]
    );
}

#[test]
fn newer_teleport_supersedes_older() {
    let f = slow_with_base(4.0);
    f.runtime.set_home(&steve(), Some("other"), here(8.0), false);
    f.drain(&steve());

    f.runtime.teleport_home(&steve(), Some("base"), false);
    f.runtime.teleport_home(&steve(), Some("other"), false);

    assert!(eventually(|| f.teleporter.len() == 1));
    thread::sleep(SLOW);
    assert_eq!(f.teleporter.teleports(), vec![(steve().id, saved(8.0))]);
    assert_eq!(
        f.seen(&steve()),
        vec![
            Notice::TeleportScheduled { delay: SLOW },
            Notice::Superseded,
            Notice::TeleportScheduled { delay: SLOW },
        ]
    );
}

#[test]
fn unparseable_teleport_target() {
    let f = fixture();
    f.runtime.teleport_home(&steve(), Some("@"), false);
    assert_eq!(f.drain(&steve()), vec![Notice::Unparseable("@".into())]);
}
