//! Owner of both executor domains.

use crate::controlling::{run_queue, Message};
use crate::{BackgroundExecutor, ControllingExecutor, ExecutorResult};
use parking_lot::Mutex;
use std::thread::JoinHandle;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// The Controlling thread plus the Background pool.
///
/// Owns both runtimes; executors only hold handles. Dropping the pair shuts
/// it down.
pub struct ExecutorPair {
    controlling: ControllingExecutor,
    background: BackgroundExecutor,
    controlling_thread: Mutex<Option<JoinHandle<()>>>,
    background_runtime: Mutex<Option<Runtime>>,
}

impl ExecutorPair {
    /// Start the Controlling thread and the Background pool.
    pub fn new() -> ExecutorResult<Self> {
        let background_runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("homes-background")
            .enable_all()
            .build()?;

        let controlling_runtime = Builder::new_current_thread().enable_all().build()?;
        let timers = controlling_runtime.handle().clone();

        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        let thread = std::thread::Builder::new()
            .name("homes-controlling".to_string())
            .spawn(move || {
                controlling_runtime.block_on(run_queue(rx));
            })?;
        let thread_id = thread.thread().id();

        let controlling = ControllingExecutor::new(tx, thread_id, timers);
        let background =
            BackgroundExecutor::new(background_runtime.handle().clone(), thread_id);

        info!("Executors started");

        Ok(Self {
            controlling,
            background,
            controlling_thread: Mutex::new(Some(thread)),
            background_runtime: Mutex::new(Some(background_runtime)),
        })
    }

    pub fn controlling(&self) -> &ControllingExecutor {
        &self.controlling
    }

    pub fn background(&self) -> &BackgroundExecutor {
        &self.background
    }

    /// Run `work` on Background, then `then(result)` on Controlling.
    pub fn dispatch<W, C, T>(&self, work: W, then: C)
    where
        W: FnOnce() -> T + Send + 'static,
        C: FnOnce(T) + Send + 'static,
        T: Send + 'static,
    {
        let controlling = self.controlling.clone();
        self.background.execute(move || {
            let result = work();
            controlling.execute(move || then(result));
        });
    }

    /// Stop both domains.
    ///
    /// Jobs already queued on Controlling run first; pending delayed jobs
    /// are dropped. Calling this again is a no-op.
    pub fn shutdown(&self) {
        let Some(thread) = self.controlling_thread.lock().take() else {
            return;
        };

        self.controlling.shutdown();
        if self.controlling.is_current() {
            warn!("Executor shutdown requested from the Controlling thread; not joining");
        } else if thread.join().is_err() {
            warn!("Controlling thread panicked");
        }

        if let Some(runtime) = self.background_runtime.lock().take() {
            runtime.shutdown_background();
        }
        info!("Executors stopped");
    }
}

impl Drop for ExecutorPair {
    fn drop(&mut self) {
        self.shutdown();
    }
}
