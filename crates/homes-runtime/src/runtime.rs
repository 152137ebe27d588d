//! Command flows.

use crate::RuntimeResult;
use homes_config_and_utils::{Config, Paths};
use homes_core::{
    HomeTarget, Location, Notice, Notifier, Subject, SubjectId, Teleporter, MAX_USERNAME_LENGTH,
};
use homes_database::{DatabasePool, HomeStore, PoolConfig};
use homes_executor::ExecutorPair;
use homes_invitations::{InvitationRegistry, PendingInvitation, DEFAULT_INVITATION_TTL};
use homes_service::{HomeError, HomeResult, HomesService, ServiceOptions};
use homes_teleport::{RelocationScheduler, DEFAULT_TELEPORT_DELAY};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Settings the runtime needs from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOptions {
    pub service: ServiceOptions,
    pub invitation_ttl: Duration,
    /// Wait before a non-instant relocation fires.
    pub teleport_delay: Duration,
}

impl RuntimeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            service: ServiceOptions::from_config(config),
            invitation_ttl: config.invitation_ttl(),
            teleport_delay: config.teleport_delay(),
        }
    }
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            service: ServiceOptions::default(),
            invitation_ttl: DEFAULT_INVITATION_TTL,
            teleport_delay: DEFAULT_TELEPORT_DELAY,
        }
    }
}

/// Why a set-home write did not happen.
enum SetRefused {
    Exists,
    NotSet,
    Failed(HomeError),
}

impl From<HomeError> for SetRefused {
    fn from(error: HomeError) -> Self {
        SetRefused::Failed(error)
    }
}

/// State reachable from jobs on either executor.
struct Shared {
    service: HomesService,
    invitations: Mutex<InvitationRegistry>,
    scheduler: RelocationScheduler,
    notifier: Arc<dyn Notifier>,
    teleport_delay: Duration,
}

impl Shared {
    fn report_failure(&self, to: &Subject, error: &HomeError) {
        debug!(subject = %to, error = %error, "Home operation failed");
        self.notifier.notify(to, Notice::Failed(error.failure()));
    }

    /// Relocate `subject` right away or after the configured delay.
    fn relocate(&self, subject: &Subject, destination: Location, instant: bool) {
        if instant {
            self.scheduler.schedule(subject, destination, Duration::ZERO);
            return;
        }
        self.scheduler
            .schedule(subject, destination, self.teleport_delay);
        self.notifier.notify(
            subject,
            Notice::TeleportScheduled {
                delay: self.teleport_delay,
            },
        );
    }

    /// Whether `location` can be reached from this server. Reports
    /// `WrongServer` to `to` when it cannot.
    fn check_server(&self, to: &Subject, target: &HomeTarget, location: &Location) -> bool {
        if location.server == self.service.server_name() {
            return true;
        }
        self.notifier.notify(
            to,
            Notice::WrongServer {
                target: target.to_human_readable(),
                server: location.server.clone(),
            },
        );
        false
    }

    fn send_invitation(&self, sender: &Subject, recipient: &Subject, location: Location) {
        let expires_in = {
            let mut invitations = self.invitations.lock();
            if invitations.peek(&sender.name, recipient.id).is_some() {
                None
            } else {
                invitations.create(sender, recipient, location);
                Some(invitations.ttl())
            }
        };

        let Some(expires_in) = expires_in else {
            self.notifier.notify(
                sender,
                Notice::AlreadyInvited {
                    recipient: recipient.name.clone(),
                },
            );
            return;
        };

        info!(sender = %sender, recipient = %recipient, "Invitation sent");
        self.notifier.notify(
            sender,
            Notice::InvitationSent {
                recipient: recipient.name.clone(),
                expires_in,
            },
        );
        self.notifier.notify(
            recipient,
            Notice::InvitationReceived {
                sender: sender.name.clone(),
            },
        );
    }
}

/// Homes, invitations and delayed teleports on one executor pair.
///
/// Dropping the runtime stops its executors; pending relocations never fire
/// after that.
pub struct HomesRuntime {
    executors: ExecutorPair,
    shared: Arc<Shared>,
}

impl HomesRuntime {
    /// Start a runtime on the pooled database under `paths`.
    pub fn open(
        config: &Config,
        paths: &Paths,
        teleporter: Arc<dyn Teleporter>,
        notifier: Arc<dyn Notifier>,
    ) -> RuntimeResult<Self> {
        config.validate()?;
        paths.ensure_dirs()?;

        let pool = DatabasePool::open(
            &paths.database_file(),
            PoolConfig {
                max_size: config.database.max_connections,
                connection_timeout: config.connection_timeout(),
                ..PoolConfig::default()
            },
        )?;
        let state = pool.state();
        debug!(
            connections = state.connections,
            idle = state.idle_connections,
            "Database pool ready"
        );

        Self::with_store(
            Arc::new(pool),
            RuntimeOptions::from_config(config),
            teleporter,
            notifier,
        )
    }

    /// Start a runtime on any store.
    pub fn with_store(
        store: Arc<dyn HomeStore>,
        options: RuntimeOptions,
        teleporter: Arc<dyn Teleporter>,
        notifier: Arc<dyn Notifier>,
    ) -> RuntimeResult<Self> {
        let executors = ExecutorPair::new()?;

        let service = HomesService::new(store, executors.background().clone(), options.service);
        let scheduler = RelocationScheduler::new(
            executors.controlling().clone(),
            teleporter,
            Arc::clone(&notifier),
        );

        info!(
            server = %service.server_name(),
            teleport_delay = ?options.teleport_delay,
            "Homes runtime started"
        );

        Ok(Self {
            executors,
            shared: Arc::new(Shared {
                service,
                invitations: Mutex::new(InvitationRegistry::new(options.invitation_ttl)),
                scheduler,
                notifier,
                teleport_delay: options.teleport_delay,
            }),
        })
    }

    pub fn service(&self) -> &HomesService {
        &self.shared.service
    }

    /// Send `notice` to `to` from the Controlling thread.
    fn notify(&self, to: &Subject, notice: Notice) {
        let shared = Arc::clone(&self.shared);
        let to = to.clone();
        self.executors
            .controlling()
            .execute(move || shared.notifier.notify(&to, notice));
    }

    /// Parse `raw`, or the default home when absent. Reports `Unparseable`
    /// to `subject` on failure.
    fn parse_target(&self, subject: &Subject, raw: Option<&str>) -> Option<HomeTarget> {
        let raw = raw.unwrap_or(self.shared.service.default_home());
        match HomeTarget::parse(raw) {
            Ok(target) => Some(target),
            Err(e) => {
                debug!(subject = %subject, raw, error = %e, "Unparseable home target");
                self.notify(subject, Notice::Unparseable(raw.to_string()));
                None
            }
        }
    }

    // ==========================================
    // Homes
    // ==========================================

    /// Teleport `subject` to a home, after the configured delay unless
    /// `instant`. Homes saved on another server are refused.
    pub fn teleport_home(&self, subject: &Subject, target: Option<&str>, instant: bool) {
        let Some(target) = self.parse_target(subject, target) else {
            return;
        };

        let worker = Arc::clone(&self.shared);
        let shared = Arc::clone(&self.shared);
        let acting = subject.clone();
        let subject = subject.clone();

        self.executors.dispatch(
            {
                let target = target.clone();
                move || worker.service.resolve_location(&target, Some(&acting))
            },
            move |resolved| match resolved {
                Ok(location) => {
                    if shared.check_server(&subject, &target, &location) {
                        shared.relocate(&subject, location, instant);
                    }
                }
                Err(e) => shared.report_failure(&subject, &e),
            },
        );
    }

    /// Save `location` as a home of `subject`.
    ///
    /// Without `allow_override` an existing name is left untouched and
    /// reported as `HomeExists`.
    pub fn set_home(
        &self,
        subject: &Subject,
        target: Option<&str>,
        location: Location,
        allow_override: bool,
    ) {
        let Some(target) = self.parse_target(subject, target) else {
            return;
        };

        let worker = Arc::clone(&self.shared);
        let shared = Arc::clone(&self.shared);
        let acting = subject.clone();
        let subject = subject.clone();

        self.executors.dispatch(
            {
                let target = target.clone();
                move || -> Result<(), SetRefused> {
                    let service = &worker.service;
                    let written = service.set_location(&target, &acting, location, allow_override)?;
                    if written {
                        return Ok(());
                    }
                    // Inserts by name are also refused for unregistered owners.
                    let insert_by_name =
                        !allow_override && !matches!(target, HomeTarget::Identifier(_));
                    if insert_by_name && service.resolve_home_id(&target, Some(&acting)).is_ok() {
                        return Err(SetRefused::Exists);
                    }
                    Err(SetRefused::NotSet)
                }
            },
            move |written: Result<(), SetRefused>| {
                let label = target.to_human_readable();
                let notice = match written {
                    Ok(()) => Notice::HomeSet { target: label },
                    Err(SetRefused::Exists) => Notice::HomeExists { target: label },
                    Err(SetRefused::NotSet) => Notice::HomeNotSet { target: label },
                    Err(SetRefused::Failed(e)) => return shared.report_failure(&subject, &e),
                };
                shared.notifier.notify(&subject, notice);
            },
        );
    }

    pub fn delete_home(&self, subject: &Subject, target: Option<&str>) {
        let Some(target) = self.parse_target(subject, target) else {
            return;
        };

        let worker = Arc::clone(&self.shared);
        let shared = Arc::clone(&self.shared);
        let acting = subject.clone();
        let subject = subject.clone();

        self.executors.dispatch(
            {
                let target = target.clone();
                move || worker.service.delete_location(&target, &acting)
            },
            move |deleted| {
                let label = target.to_human_readable();
                let notice = match deleted {
                    Ok(true) => Notice::HomeDeleted { target: label },
                    Ok(false) => Notice::NothingDeleted { target: label },
                    Err(e) => return shared.report_failure(&subject, &e),
                };
                shared.notifier.notify(&subject, notice);
            },
        );
    }

    /// List the homes of `owner` to `subject`, sorted by name.
    ///
    /// `owner` is a display name, or a stable id when longer than a display
    /// name can be. Absent means `subject` itself.
    pub fn list_homes(&self, subject: &Subject, owner: Option<&str>) {
        let (label, known) = match owner {
            None => (subject.name.clone(), Some(subject.id)),
            Some(raw) if raw.chars().count() > MAX_USERNAME_LENGTH => {
                match raw.parse::<SubjectId>() {
                    Ok(id) => (raw.to_string(), Some(id)),
                    Err(_) => {
                        debug!(subject = %subject, raw, "Unparseable owner id");
                        self.notify(subject, Notice::Unparseable(raw.to_string()));
                        return;
                    }
                }
            }
            Some(name) => (name.to_string(), None),
        };

        let worker = Arc::clone(&self.shared);
        let shared = Arc::clone(&self.shared);
        let subject = subject.clone();

        self.executors.dispatch(
            {
                let label = label.clone();
                move || -> HomeResult<_> {
                    let owner = match known {
                        Some(id) => id,
                        None => worker.service.resolve_owner(&label)?,
                    };
                    worker.service.list_homes(owner)
                }
            },
            move |listed| match listed {
                Ok(homes) => {
                    let mut homes: Vec<(String, Location)> = homes.into_iter().collect();
                    homes.sort_by_cached_key(|(name, _)| name.to_lowercase());
                    shared
                        .notifier
                        .notify(&subject, Notice::HomeList { owner: label, homes });
                }
                Err(e) => shared.report_failure(&subject, &e),
            },
        );
    }

    /// Completion candidates from cached data only.
    pub fn complete(
        &self,
        argument: &str,
        acting: Option<&Subject>,
        allow_foreign: bool,
    ) -> Vec<String> {
        self.shared.service.complete(argument, acting, allow_foreign)
    }

    // ==========================================
    // Invitations
    // ==========================================

    /// Invite `recipient` to a home of the sender's choosing, or to
    /// `current` (the sender's own position) when `target` is absent.
    pub fn invite(
        &self,
        sender: &Subject,
        recipient: &Subject,
        target: Option<&str>,
        current: Location,
    ) {
        if sender.id == recipient.id {
            self.notify(sender, Notice::CannotInviteSelf);
            return;
        }

        let shared = Arc::clone(&self.shared);
        let sender = sender.clone();
        let recipient = recipient.clone();

        let Some(raw) = target else {
            let location = current.on_server(self.shared.service.server_name());
            self.executors.controlling().execute(move || {
                shared.send_invitation(&sender, &recipient, location);
            });
            return;
        };

        let Some(target) = self.parse_target(&sender, Some(raw)) else {
            return;
        };

        let worker = Arc::clone(&self.shared);
        let acting = sender.clone();

        self.executors.dispatch(
            {
                let target = target.clone();
                move || worker.service.resolve_location(&target, Some(&acting))
            },
            move |resolved| match resolved {
                Ok(location) => {
                    if shared.check_server(&sender, &target, &location) {
                        shared.send_invitation(&sender, &recipient, location);
                    }
                }
                Err(e) => shared.report_failure(&sender, &e),
            },
        );
    }

    /// Accept the invitation `sender_name` sent to `recipient` and start the
    /// relocation.
    pub fn accept_invitation(&self, recipient: &Subject, sender_name: &str) {
        let shared = Arc::clone(&self.shared);
        let recipient = recipient.clone();
        let sender_name = sender_name.to_string();

        self.executors.controlling().execute(move || {
            let invitation = shared
                .invitations
                .lock()
                .consume(&sender_name, recipient.id);
            let Some(invitation) = invitation else {
                shared
                    .notifier
                    .notify(&recipient, Notice::InvitationMissing { sender: sender_name });
                return;
            };

            info!(sender = %invitation.sender, recipient = %recipient, "Invitation accepted");
            shared.notifier.notify(
                &invitation.sender,
                Notice::InvitationAccepted {
                    by: recipient.name.clone(),
                },
            );
            shared.relocate(&recipient, invitation.location, false);
        });
    }

    pub fn decline_invitation(&self, recipient: &Subject, sender_name: &str) {
        let shared = Arc::clone(&self.shared);
        let recipient = recipient.clone();
        let sender_name = sender_name.to_string();

        self.executors.controlling().execute(move || {
            let invitation = shared
                .invitations
                .lock()
                .consume(&sender_name, recipient.id);
            let Some(invitation) = invitation else {
                shared
                    .notifier
                    .notify(&recipient, Notice::InvitationMissing { sender: sender_name });
                return;
            };

            debug!(sender = %invitation.sender, recipient = %recipient, "Invitation declined");
            shared.notifier.notify(
                &invitation.sender,
                Notice::InvitationDeclined {
                    by: recipient.name.clone(),
                },
            );
            shared.notifier.notify(
                &recipient,
                Notice::InvitationDismissed {
                    sender: invitation.sender.name,
                },
            );
        });
    }

    /// The valid invitation from `sender_name` to `recipient`, if any.
    pub fn pending_invitation(
        &self,
        sender_name: &str,
        recipient: SubjectId,
    ) -> Option<PendingInvitation> {
        self.shared.invitations.lock().peek(sender_name, recipient)
    }

    pub fn is_relocation_pending(&self, subject: SubjectId) -> bool {
        self.shared.scheduler.is_pending(subject)
    }

    // ==========================================
    // Sessions
    // ==========================================

    /// Register `subject` and drop its cached lookups.
    pub fn on_subject_connect(&self, subject: &Subject) {
        let shared = Arc::clone(&self.shared);
        let subject = subject.clone();
        self.executors.background().execute(move || {
            shared.service.on_subject_connect(&subject);
        });
    }

    /// Drop `subject`'s cached lookups, invitations and pending relocation.
    pub fn on_subject_disconnect(&self, subject: &Subject) {
        let shared = Arc::clone(&self.shared);
        let subject = subject.clone();
        self.executors.controlling().execute(move || {
            shared.service.on_subject_disconnect(&subject);
            shared.invitations.lock().remove_subject(&subject);
            shared.scheduler.on_subject_disconnect(&subject);
        });
    }

    /// Cancel `subject`'s pending relocation if it changed position.
    pub fn on_subject_moved(&self, subject: &Subject, from: &Location, to: &Location) {
        let same_position = from.same_position(to);
        let shared = Arc::clone(&self.shared);
        let subject = subject.clone();
        self.executors.controlling().execute(move || {
            shared.scheduler.on_subject_moved(&subject, same_position);
        });
    }

    // ==========================================
    // Lifecycle
    // ==========================================

    /// Wait until every job queued on the Controlling thread so far has run.
    ///
    /// Flows started from a Background thread have queued their effects by
    /// the time they return, so this also waits for those effects.
    pub fn flush(&self) -> RuntimeResult<()> {
        self.executors.controlling().call(|| ())?;
        Ok(())
    }

    /// Sweep expired cache entries. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.shared.service.cleanup()
    }

    /// Cancel pending relocations and stop both executors.
    pub fn shutdown(&self) {
        let cancelled = self.shared.scheduler.cancel_all();
        self.executors.shutdown();
        info!(cancelled, "Homes runtime stopped");
    }
}
