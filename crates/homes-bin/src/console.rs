//! Notices rendered to the terminal.

use homes_core::{HomeFailure, Location, Notice, Notifier, Subject, Teleporter};

/// Prints every notice on stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, _to: &Subject, notice: Notice) {
        println!("{}", render(&notice));
    }
}

/// Prints relocations instead of performing them.
pub struct ConsoleTeleporter;

impl Teleporter for ConsoleTeleporter {
    fn teleport(&self, subject: &Subject, destination: &Location) {
        println!("{subject} -> {destination}");
    }
}

pub fn render(notice: &Notice) -> String {
    match notice {
        Notice::Unparseable(raw) => format!("'{raw}' is not a valid home"),
        Notice::Failed(failure) => render_failure(failure),
        Notice::WrongServer { target, server } => {
            format!("Home '{target}' is on server '{server}'")
        }
        Notice::TeleportScheduled { delay } => {
            format!("Teleporting in {:.1}s, don't move", delay.as_secs_f64())
        }
        Notice::Superseded => "Previous teleport cancelled".to_string(),
        Notice::CancelledByMove => "Teleport cancelled, you moved".to_string(),
        Notice::HomeSet { target } => format!("Home '{target}' set"),
        Notice::HomeExists { target } => {
            format!("Home '{target}' already exists, use --override to replace it")
        }
        Notice::HomeNotSet { target } => format!("Home '{target}' was not set"),
        Notice::HomeDeleted { target } => format!("Home '{target}' deleted"),
        Notice::NothingDeleted { target } => format!("Home '{target}' does not exist"),
        Notice::HomeList { owner, homes } => {
            if homes.is_empty() {
                return format!("{owner} has no homes");
            }
            let mut out = format!("Homes of {owner}:");
            for (name, location) in homes {
                out.push_str(&format!("\n  {name}: {location}"));
            }
            out
        }
        Notice::InvitationSent {
            recipient,
            expires_in,
        } => format!(
            "Invited {recipient}, the invitation expires in {}s",
            expires_in.as_secs()
        ),
        Notice::InvitationReceived { sender } => format!("{sender} invited you"),
        Notice::AlreadyInvited { recipient } => format!("{recipient} is already invited"),
        Notice::CannotInviteSelf => "You can't invite yourself".to_string(),
        Notice::InvitationAccepted { by } => format!("{by} accepted your invitation"),
        Notice::InvitationDeclined { by } => format!("{by} declined your invitation"),
        Notice::InvitationDismissed { sender } => {
            format!("Declined the invitation from {sender}")
        }
        Notice::InvitationMissing { sender } => format!("No invitation from {sender}"),
    }
}

fn render_failure(failure: &HomeFailure) -> String {
    match failure {
        HomeFailure::NotFound(target) => format!("Home '{target}' not found"),
        other => {
            let message = other.to_string();
            let mut chars = message.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn renders_listing() {
        let notice = Notice::HomeList {
            owner: "Steve".into(),
            homes: vec![(
                "base".into(),
                Location::new(1.0, 64.0, -2.5, 0.0, 0.0, "world", "lobby"),
            )],
        };
        assert_eq!(
            render(&notice),
            "Homes of Steve:\n  base: 1.0, 64.0, -2.5 in world on lobby"
        );
        assert_eq!(
            render(&Notice::HomeList {
                owner: "Alex".into(),
                homes: vec![]
            }),
            "Alex has no homes"
        );
    }

    #[test]
    fn renders_failures() {
        assert_eq!(
            render(&Notice::Failed(HomeFailure::NotFound("base".into()))),
            "Home 'base' not found"
        );
        assert_eq!(
            render(&Notice::Failed(HomeFailure::UnknownOwner("Nobody".into()))),
            "Player 'Nobody' is not registered"
        );
    }

    #[test]
    fn renders_delay() {
        assert_eq!(
            render(&Notice::TeleportScheduled {
                delay: Duration::from_millis(2500)
            }),
            "Teleporting in 2.5s, don't move"
        );
    }
}
