//! Dual-context executors.
//!
//! Work is split between two domains:
//! - **Controlling**: one dedicated thread that owns every visible side effect.
//!   Jobs run in FIFO order; delayed jobs run there too.
//! - **Background**: any other thread. Blocking storage calls live here and are
//!   handed to a tokio blocking pool when issued from the Controlling thread.
//!
//! Each executor runs a job inline when the caller is already in its domain.
//!
//! ```ignore
//! let executors = ExecutorPair::new()?;
//! executors.dispatch(
//!     move || store.get_home_by_id(42),
//!     move |home| notify(home),
//! );
//! ```

mod background;
mod controlling;
mod error;
mod pair;

pub use background::BackgroundExecutor;
pub use controlling::{ControllingExecutor, ScheduledTask};
pub use error::{ExecutorError, ExecutorResult};
pub use pair::ExecutorPair;

/// A unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;
