//! The Controlling executor.

use crate::{ExecutorError, ExecutorResult, Job};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, trace};

pub(crate) enum Message {
    Run(Job),
    Shutdown,
}

/// Handle to the single Controlling thread.
///
/// Cheap to clone; every clone feeds the same FIFO queue.
#[derive(Clone)]
pub struct ControllingExecutor {
    tx: mpsc::UnboundedSender<Message>,
    thread_id: ThreadId,
    timers: Handle,
    next_task_id: Arc<AtomicU64>,
}

impl ControllingExecutor {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Message>,
        thread_id: ThreadId,
        timers: Handle,
    ) -> Self {
        Self {
            tx,
            thread_id,
            timers,
            next_task_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Whether the calling thread is the Controlling thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Id of the Controlling thread.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Run `job` on the Controlling thread.
    ///
    /// Inline when already there; otherwise queued behind earlier jobs. Jobs
    /// queued after shutdown are dropped.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_current() {
            job();
            return;
        }
        if self.tx.send(Message::Run(Box::new(job))).is_err() {
            debug!("Controlling executor shut down, job dropped");
        }
    }

    /// Run `job` on the Controlling thread and wait for its result.
    ///
    /// Must not be called from inside an async context on another runtime.
    pub fn call<F, T>(&self, job: F) -> ExecutorResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_current() {
            return Ok(job());
        }
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Message::Run(Box::new(move || {
                let _ = tx.send(job());
            })))
            .map_err(|_| ExecutorError::Shutdown)?;
        rx.blocking_recv().map_err(|_| ExecutorError::Shutdown)
    }

    /// Run `job` on the Controlling thread once `delay` has elapsed.
    ///
    /// A zero delay still goes through the timer, so the job never runs
    /// before this call returns.
    pub fn run_later<F>(&self, delay: Duration, job: F) -> ScheduledTask
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let claimed = Arc::new(AtomicBool::new(false));

        let fire_claim = Arc::clone(&claimed);
        let handle = self.timers.spawn(async move {
            tokio::time::sleep(delay).await;
            if fire_claim
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                trace!(task_id = id, "Scheduled task firing");
                job();
            }
        });

        ScheduledTask {
            id,
            claimed,
            abort: handle.abort_handle(),
        }
    }

    pub(crate) fn shutdown(&self) -> bool {
        self.tx.send(Message::Shutdown).is_ok()
    }
}

/// A delayed job that can still be cancelled.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    id: u64,
    claimed: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl ScheduledTask {
    /// Unique per executor pair.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Prevent the job from running.
    ///
    /// Returns `true` only for the call that actually stopped it. Once the
    /// job has started firing, cancelling is a no-op returning `false`.
    pub fn cancel(&self) -> bool {
        let won = self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.abort.abort();
        }
        won
    }

    /// Whether the job has fired or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

/// Drain the queue until a shutdown message arrives.
pub(crate) async fn run_queue(mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Run(job) => job(),
            Message::Shutdown => break,
        }
    }
    debug!("Controlling queue stopped");
}
