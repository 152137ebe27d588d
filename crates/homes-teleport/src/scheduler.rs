//! The relocation scheduler.

use homes_core::{Location, Notice, Notifier, Subject, SubjectId, Teleporter};
use homes_executor::{ControllingExecutor, ScheduledTask};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Wait before a non-instant relocation fires.
pub const DEFAULT_TELEPORT_DELAY: Duration = Duration::from_secs(5);

struct PendingRelocation {
    subject: Subject,
    destination: Location,
    generation: u64,
    task: ScheduledTask,
}

type PendingMap = Arc<Mutex<HashMap<SubjectId, PendingRelocation>>>;

/// Per-subject pending relocations.
///
/// Relocations fire on the Controlling thread. A relocation only fires while
/// it is still the subject's current entry, so a cancel that loses the race
/// with the timer cannot produce a second teleport.
pub struct RelocationScheduler {
    controlling: ControllingExecutor,
    teleporter: Arc<dyn Teleporter>,
    notifier: Arc<dyn Notifier>,
    pending: PendingMap,
    next_generation: AtomicU64,
}

impl RelocationScheduler {
    pub fn new(
        controlling: ControllingExecutor,
        teleporter: Arc<dyn Teleporter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            controlling,
            teleporter,
            notifier,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Relocate `subject` to `destination` after `delay`.
    ///
    /// Any relocation already pending for the subject is cancelled and
    /// reported as superseded before the new one is installed. A zero delay
    /// relocates right away.
    pub fn schedule(&self, subject: &Subject, destination: Location, delay: Duration) {
        if delay.is_zero() {
            let previous = self.take(subject.id);
            self.report_superseded(subject, previous);
            let teleporter = Arc::clone(&self.teleporter);
            let subject = subject.clone();
            self.controlling.execute(move || {
                teleporter.teleport(&subject, &destination);
            });
            return;
        }

        let previous = self.take(subject.id);
        self.report_superseded(subject, previous);

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        // Held across run_later so the timer cannot look for the entry
        // before it is installed.
        let displaced = {
            let mut pending = self.pending.lock();
            let task = self.controlling.run_later(
                delay,
                fire(
                    Arc::clone(&self.pending),
                    Arc::clone(&self.teleporter),
                    subject.id,
                    generation,
                ),
            );
            pending.insert(
                subject.id,
                PendingRelocation {
                    subject: subject.clone(),
                    destination,
                    generation,
                    task,
                },
            )
        };

        debug!(subject = %subject, ?delay, "Relocation scheduled");
        // Only set when another thread scheduled for the same subject in between.
        self.report_superseded(subject, displaced);
    }

    fn report_superseded(&self, subject: &Subject, previous: Option<PendingRelocation>) {
        if let Some(previous) = previous {
            previous.task.cancel();
            debug!(subject = %subject, "Pending relocation superseded");
            self.notifier.notify(subject, Notice::Superseded);
        }
    }

    /// Movement hook. Cancels the pending relocation unless the subject kept
    /// its position; turning on the spot does not count as moving.
    pub fn on_subject_moved(&self, subject: &Subject, same_position: bool) {
        if same_position {
            return;
        }
        if let Some(relocation) = self.take(subject.id) {
            relocation.task.cancel();
            debug!(subject = %subject, "Pending relocation cancelled by movement");
            self.notifier.notify(subject, Notice::CancelledByMove);
        }
    }

    /// Disconnect hook. Cancels silently.
    pub fn on_subject_disconnect(&self, subject: &Subject) {
        if let Some(relocation) = self.take(subject.id) {
            relocation.task.cancel();
            debug!(subject = %subject, "Pending relocation dropped on disconnect");
        }
    }

    pub fn is_pending(&self, subject: SubjectId) -> bool {
        self.pending.lock().contains_key(&subject)
    }

    pub fn pending_destination(&self, subject: SubjectId) -> Option<Location> {
        self.pending
            .lock()
            .get(&subject)
            .map(|relocation| relocation.destination.clone())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Cancel every pending relocation silently. Returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingRelocation> =
            self.pending.lock().drain().map(|(_, relocation)| relocation).collect();
        for relocation in &drained {
            relocation.task.cancel();
        }
        drained.len()
    }

    fn take(&self, subject: SubjectId) -> Option<PendingRelocation> {
        self.pending.lock().remove(&subject)
    }
}

fn fire(
    pending: PendingMap,
    teleporter: Arc<dyn Teleporter>,
    subject: SubjectId,
    generation: u64,
) -> impl FnOnce() + Send + 'static {
    move || {
        let current = {
            let mut pending = pending.lock();
            match pending.get(&subject) {
                Some(relocation) if relocation.generation == generation => pending.remove(&subject),
                _ => None,
            }
        };
        if let Some(relocation) = current {
            debug!(subject = %relocation.subject, "Relocation firing");
            teleporter.teleport(&relocation.subject, &relocation.destination);
        }
    }
}
