//! The invitation registry.

use chrono::{DateTime, Utc};
use homes_core::{Location, Subject, SubjectId};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

/// How long an invitation stays valid by default.
pub const DEFAULT_INVITATION_TTL: Duration = Duration::from_secs(120);

/// An invitation from `sender` for `recipient` to come to `location`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInvitation {
    pub sender: Subject,
    pub recipient: Subject,
    pub location: Location,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingInvitation {
    /// Valid strictly before `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Invitations indexed by sender and by recipient.
///
/// Senders are keyed by lower-cased display name, recipients by id. Both
/// indices are only touched together, so every stored invitation has exactly
/// one entry in each.
#[derive(Debug)]
pub struct InvitationRegistry {
    ttl: chrono::Duration,
    sent: HashMap<String, HashMap<SubjectId, PendingInvitation>>,
    received: HashMap<SubjectId, HashSet<String>>,
}

impl Default for InvitationRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_INVITATION_TTL)
    }
}

impl InvitationRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            sent: HashMap::new(),
            received: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    /// Number of stored invitations, expired ones included until noticed.
    pub fn len(&self) -> usize {
        self.sent.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }

    /// Invite `recipient` to `location`, replacing an earlier invitation
    /// between the same pair.
    pub fn create(
        &mut self,
        sender: &Subject,
        recipient: &Subject,
        location: Location,
    ) -> PendingInvitation {
        self.create_at(sender, recipient, location, Utc::now())
    }

    pub fn create_at(
        &mut self,
        sender: &Subject,
        recipient: &Subject,
        location: Location,
        now: DateTime<Utc>,
    ) -> PendingInvitation {
        let invitation = PendingInvitation {
            sender: sender.clone(),
            recipient: recipient.clone(),
            location,
            created_at: now,
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.insert_pair(sender.name_key(), recipient.id, invitation.clone());
        debug!(sender = %sender, recipient = %recipient, "Invitation created");
        invitation
    }

    /// The valid invitation from `sender_name` to `recipient`, left in place.
    pub fn peek(&mut self, sender_name: &str, recipient: SubjectId) -> Option<PendingInvitation> {
        self.peek_at(sender_name, recipient, Utc::now())
    }

    pub fn peek_at(
        &mut self,
        sender_name: &str,
        recipient: SubjectId,
        now: DateTime<Utc>,
    ) -> Option<PendingInvitation> {
        let sender_key = sender_name.to_ascii_lowercase();
        let invitation = self.sent.get(&sender_key)?.get(&recipient)?;
        if invitation.is_valid_at(now) {
            return Some(invitation.clone());
        }
        self.remove_pair(&sender_key, recipient);
        None
    }

    /// Take the valid invitation from `sender_name` to `recipient`.
    pub fn consume(
        &mut self,
        sender_name: &str,
        recipient: SubjectId,
    ) -> Option<PendingInvitation> {
        self.consume_at(sender_name, recipient, Utc::now())
    }

    pub fn consume_at(
        &mut self,
        sender_name: &str,
        recipient: SubjectId,
        now: DateTime<Utc>,
    ) -> Option<PendingInvitation> {
        self.remove_pair(&sender_name.to_ascii_lowercase(), recipient)
            .filter(|invitation| invitation.is_valid_at(now))
    }

    /// Drop everything `subject` sent or received. Returns how many
    /// invitations were removed.
    pub fn remove_subject(&mut self, subject: &Subject) -> usize {
        let sender_key = subject.name_key();
        let mut removed = 0;

        if let Some(outgoing) = self.sent.remove(&sender_key) {
            for recipient in outgoing.keys() {
                self.unlink_received(*recipient, &sender_key);
            }
            removed += outgoing.len();
        }

        if let Some(incoming) = self.received.remove(&subject.id) {
            for sender in &incoming {
                if self.unlink_sent(sender, subject.id).is_some() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!(subject = %subject, removed, "Invitations dropped");
        }
        removed
    }

    fn insert_pair(&mut self, sender_key: String, recipient: SubjectId, invitation: PendingInvitation) {
        self.received
            .entry(recipient)
            .or_default()
            .insert(sender_key.clone());
        self.sent
            .entry(sender_key)
            .or_default()
            .insert(recipient, invitation);
    }

    fn remove_pair(&mut self, sender_key: &str, recipient: SubjectId) -> Option<PendingInvitation> {
        self.unlink_received(recipient, sender_key);
        self.unlink_sent(sender_key, recipient)
    }

    fn unlink_sent(&mut self, sender_key: &str, recipient: SubjectId) -> Option<PendingInvitation> {
        let outgoing = self.sent.get_mut(sender_key)?;
        let invitation = outgoing.remove(&recipient);
        if outgoing.is_empty() {
            self.sent.remove(sender_key);
        }
        invitation
    }

    fn unlink_received(&mut self, recipient: SubjectId, sender_key: &str) {
        if let Some(incoming) = self.received.get_mut(&recipient) {
            incoming.remove(sender_key);
            if incoming.is_empty() {
                self.received.remove(&recipient);
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let forward: usize = self.sent.values().map(HashMap::len).sum();
        let reverse: usize = self.received.values().map(HashSet::len).sum();
        assert_eq!(forward, reverse);
        for (sender, outgoing) in &self.sent {
            assert!(!outgoing.is_empty());
            for recipient in outgoing.keys() {
                assert!(self.received[recipient].contains(sender));
            }
        }
        assert!(self.received.values().all(|incoming| !incoming.is_empty()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(n: u128, name: &str) -> Subject {
        Subject::new(SubjectId::from_u128(n), name)
    }

    fn spot() -> Location {
        Location::new(1.0, 2.0, 3.0, 0.0, 0.0, "world", "lobby")
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn peek_is_directional() {
        let (a, b) = (subject(1, "A"), subject(2, "B"));
        let mut registry = InvitationRegistry::default();
        registry.create_at(&a, &b, spot(), start());

        assert!(registry.peek_at("A", b.id, start()).is_some());
        assert!(registry.peek_at("a", b.id, start()).is_some());
        assert!(registry.peek_at("B", a.id, start()).is_none());
        assert_eq!(registry.len(), 1);
        registry.assert_consistent();
    }

    #[test]
    fn consume_takes_once() {
        let (a, b) = (subject(1, "A"), subject(2, "B"));
        let mut registry = InvitationRegistry::default();
        registry.create_at(&a, &b, spot(), start());

        let invitation = registry.consume_at("A", b.id, start()).unwrap();
        assert_eq!(invitation.sender, a);
        assert_eq!(invitation.location, spot());
        assert!(registry.consume_at("A", b.id, start()).is_none());
        assert!(registry.is_empty());
        registry.assert_consistent();
    }

    #[test]
    fn expired_invitations_vanish() {
        let (a, b) = (subject(1, "A"), subject(2, "B"));
        let mut registry = InvitationRegistry::default();
        let invitation = registry.create_at(&a, &b, spot(), start());
        assert_eq!(invitation.expires_at - invitation.created_at, chrono::Duration::seconds(120));

        let just_before = start() + chrono::Duration::milliseconds(119_999);
        assert!(registry.peek_at("A", b.id, just_before).is_some());

        let at_expiry = start() + chrono::Duration::seconds(120);
        assert!(registry.peek_at("A", b.id, at_expiry).is_none());
        assert!(registry.is_empty());
        assert!(registry.peek_at("A", b.id, start()).is_none());
        registry.assert_consistent();
    }

    #[test]
    fn consume_of_expired_invitation_still_clears_it() {
        let (a, b) = (subject(1, "A"), subject(2, "B"));
        let mut registry = InvitationRegistry::default();
        registry.create_at(&a, &b, spot(), start());

        let late = start() + chrono::Duration::minutes(5);
        assert!(registry.consume_at("A", b.id, late).is_none());
        assert!(registry.is_empty());
        registry.assert_consistent();
    }

    #[test]
    fn create_replaces_same_pair() {
        let (a, b) = (subject(1, "A"), subject(2, "B"));
        let mut registry = InvitationRegistry::default();
        registry.create_at(&a, &b, spot(), start());

        let elsewhere = Location::new(9.0, 9.0, 9.0, 0.0, 0.0, "world", "lobby");
        registry.create_at(&a, &b, elsewhere.clone(), start());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.peek_at("A", b.id, start()).unwrap().location, elsewhere);
        registry.assert_consistent();
    }

    #[test]
    fn disconnect_drops_both_directions() {
        let (a, b, c) = (subject(1, "A"), subject(2, "B"), subject(3, "C"));
        let mut registry = InvitationRegistry::default();
        registry.create_at(&a, &b, spot(), start());
        registry.create_at(&a, &c, spot(), start());
        registry.create_at(&c, &a, spot(), start());
        registry.create_at(&b, &c, spot(), start());
        assert_eq!(registry.len(), 4);

        assert_eq!(registry.remove_subject(&a), 3);
        assert_eq!(registry.len(), 1);
        assert!(registry.peek_at("A", b.id, start()).is_none());
        assert!(registry.peek_at("C", a.id, start()).is_none());
        assert!(registry.peek_at("B", c.id, start()).is_some());
        registry.assert_consistent();

        assert_eq!(registry.remove_subject(&a), 0);
    }

    #[test]
    fn recipient_disconnect_clears_sender_side() {
        let (a, b) = (subject(1, "A"), subject(2, "B"));
        let mut registry = InvitationRegistry::default();
        registry.create_at(&a, &b, spot(), start());

        assert_eq!(registry.remove_subject(&b), 1);
        assert!(registry.is_empty());
        registry.assert_consistent();
    }

    #[test]
    fn custom_ttl() {
        let (a, b) = (subject(1, "A"), subject(2, "B"));
        let mut registry = InvitationRegistry::new(Duration::from_secs(10));
        assert_eq!(registry.ttl(), Duration::from_secs(10));

        registry.create_at(&a, &b, spot(), start());
        assert!(registry
            .peek_at("A", b.id, start() + chrono::Duration::seconds(11))
            .is_none());
    }

    #[test]
    fn wall_clock_api() {
        let (a, b) = (subject(1, "A"), subject(2, "B"));
        let mut registry = InvitationRegistry::default();
        registry.create(&a, &b, spot());
        assert!(registry.peek("A", b.id).is_some());
        assert!(registry.consume("A", b.id).is_some());
        assert!(registry.consume("A", b.id).is_none());
    }
}
