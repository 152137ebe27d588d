//! Setting, deleting and listing homes.

use super::*;
use homes_core::HomeFailure;
use homes_database::HomeStore;

#[test]
fn set_refuses_taken_name_unless_overriding() {
    let f = fixture();

    f.runtime.set_home(&steve(), Some("base"), here(1.0), false);
    f.runtime.set_home(&steve(), Some("base"), here(2.0), false);
    assert_eq!(
        f.drain(&steve()),
        vec![
            Notice::HomeSet {
                target: "base".into()
            },
            Notice::HomeExists {
                target: "base".into()
            },
        ]
    );
    assert_eq!(
        f.store.get_home_by_owner_and_name(steve().id, "base").unwrap().unwrap().location,
        saved(1.0)
    );

    f.runtime.set_home(&steve(), Some("BASE"), here(2.0), true);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::HomeSet {
            target: "BASE".into()
        }]
    );
    assert_eq!(
        f.store.get_home_by_owner_and_name(steve().id, "base").unwrap().unwrap().location,
        saved(2.0)
    );
}

#[test]
fn missing_name_falls_back_to_default_home() {
    let f = fixture();
    f.runtime.set_home(&steve(), None, here(1.0), false);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::HomeSet {
            target: "default".into()
        }]
    );
    assert!(f
        .store
        .get_home_by_owner_and_name(steve().id, "default")
        .unwrap()
        .is_some());
}

#[test]
fn moving_a_home_by_identifier() {
    let f = fixture();
    f.runtime.set_home(&steve(), Some("base"), here(1.0), false);
    f.drain(&steve());
    let home_id = f
        .store
        .get_home_by_owner_and_name(steve().id, "base")
        .unwrap()
        .unwrap()
        .home_id;

    let by_id = format!("@{home_id}");
    f.runtime.set_home(&alex(), Some(&by_id), here(7.0), false);
    assert_eq!(
        f.drain(&alex()),
        vec![Notice::HomeSet {
            target: by_id.clone()
        }]
    );
    assert_eq!(
        f.store.get_home_by_id(home_id).unwrap().unwrap().location,
        saved(7.0)
    );

    f.runtime.set_home(&alex(), Some("@999"), here(7.0), false);
    assert_eq!(
        f.drain(&alex()),
        vec![Notice::HomeNotSet {
            target: "@999".into()
        }]
    );
}

#[test]
fn unregistered_owner_is_told_home_not_set() {
    let f = fixture_with(options());

    f.runtime.set_home(&steve(), Some("base"), here(1.0), false);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::HomeNotSet {
            target: "base".into()
        }]
    );
    assert!(f.store.get_homes_by_owner(steve().id).unwrap().is_empty());
}

#[test]
fn unparseable_target_touches_nothing() {
    let f = fixture();
    for raw in ["@abc", ":base", "Steve:", ""] {
        f.runtime.set_home(&steve(), Some(raw), here(1.0), false);
        assert_eq!(f.drain(&steve()), vec![Notice::Unparseable(raw.into())]);
    }
    assert!(f.store.get_homes_by_owner(steve().id).unwrap().is_empty());
}

#[test]
fn unknown_owner_is_reported() {
    let f = fixture();
    f.runtime.set_home(&steve(), Some("Nobody:base"), here(1.0), false);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::Failed(HomeFailure::UnknownOwner("Nobody".into()))]
    );
}

#[test]
fn delete_then_nothing_left() {
    let f = fixture();
    f.runtime.set_home(&steve(), Some("base"), here(1.0), false);
    f.drain(&steve());

    f.runtime.delete_home(&steve(), Some("base"));
    f.runtime.delete_home(&steve(), Some("base"));
    assert_eq!(
        f.drain(&steve()),
        vec![
            Notice::HomeDeleted {
                target: "base".into()
            },
            Notice::NothingDeleted {
                target: "base".into()
            },
        ]
    );

    f.runtime.teleport_home(&steve(), Some("base"), true);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::Failed(HomeFailure::NotFound("base".into()))]
    );
}

#[test]
fn delete_of_foreign_home() {
    let f = fixture();
    f.runtime.set_home(&steve(), Some("base"), here(1.0), false);
    f.drain(&steve());

    f.runtime.delete_home(&alex(), Some("steve:base"));
    assert_eq!(
        f.drain(&alex()),
        vec![Notice::HomeDeleted {
            target: "steve:base".into()
        }]
    );
    assert!(f.store.get_homes_by_owner(steve().id).unwrap().is_empty());
}

#[test]
fn list_is_sorted_by_name() {
    let f = fixture();
    f.runtime.set_home(&steve(), Some("zeta"), here(3.0), false);
    f.runtime.set_home(&steve(), Some("Alpha"), here(1.0), false);
    f.runtime.set_home(&steve(), Some("mid"), here(2.0), false);
    f.drain(&steve());

    f.runtime.list_homes(&steve(), None);
    assert_eq!(
        f.drain(&steve()),
        vec![Notice::HomeList {
            owner: "Steve".into(),
            homes: vec![
                ("Alpha".into(), saved(1.0)),
                ("mid".into(), saved(2.0)),
                ("zeta".into(), saved(3.0)),
            ],
        }]
    );
}

#[test]
fn list_of_another_owner() {
    let f = fixture();
    f.runtime.set_home(&steve(), Some("base"), here(1.0), false);
    f.drain(&steve());

    f.runtime.list_homes(&alex(), Some("steve"));
    f.runtime.list_homes(&alex(), Some(&steve().id.to_string()));
    f.runtime.list_homes(&alex(), Some("Nobody"));
    f.runtime.list_homes(&alex(), Some("definitely-not-a-uuid"));

    assert_eq!(
        f.drain(&alex()),
        vec![
            Notice::HomeList {
                owner: "steve".into(),
                homes: vec![("base".into(), saved(1.0))],
            },
            Notice::HomeList {
                owner: steve().id.to_string(),
                homes: vec![("base".into(), saved(1.0))],
            },
            Notice::Failed(HomeFailure::UnknownOwner("Nobody".into())),
            Notice::Unparseable("definitely-not-a-uuid".into()),
        ]
    );
}

#[test]
fn completion_offers_own_and_foreign_names() {
    let f = fixture();
    f.runtime.set_home(&steve(), Some("base"), here(1.0), false);
    f.runtime.set_home(&steve(), Some("beach"), here(2.0), false);
    f.drain(&steve());

    assert!(eventually(|| {
        f.runtime.complete("b", Some(&steve()), false) == vec!["base", "beach"]
    }));
    assert!(eventually(|| {
        f.runtime.complete("Steve:ba", Some(&alex()), true) == vec!["Steve:base"]
    }));
    assert!(f.runtime.complete("Steve:ba", Some(&alex()), false).is_empty());
    assert!(f.runtime.complete("b", None, false).is_empty());
}
