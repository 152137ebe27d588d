//! The Background executor.

use std::thread::ThreadId;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Runs blocking work away from the Controlling thread.
///
/// Any thread other than the Controlling one counts as Background, so calls
/// from a storage worker or a test thread run inline. Jobs carry no ordering
/// guarantee relative to each other.
#[derive(Clone)]
pub struct BackgroundExecutor {
    pool: Handle,
    controlling: ThreadId,
}

impl BackgroundExecutor {
    pub(crate) fn new(pool: Handle, controlling: ThreadId) -> Self {
        Self { pool, controlling }
    }

    /// Whether the calling thread is already a Background thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() != self.controlling
    }

    /// Run `job` off the Controlling thread.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_current() {
            job();
        } else {
            drop(self.pool.spawn_blocking(job));
        }
    }

    /// Hand `job` to the blocking pool even when the caller is a Background
    /// thread, so the caller never waits for it.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.pool.spawn_blocking(job));
    }

    /// Run `job` off the Controlling thread; the result arrives on the receiver.
    ///
    /// The receiver is already completed when the job ran inline.
    pub fn submit<F, T>(&self, job: F) -> oneshot::Receiver<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.execute(move || {
            let _ = tx.send(job());
        });
        rx
    }
}
