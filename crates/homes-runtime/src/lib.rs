//! The homes runtime.
//!
//! [`HomesRuntime`] ties the resolution service, the invitation registry and
//! the relocation scheduler to one executor pair. Each command flow may be
//! started from any thread: storage work runs on Background, and every
//! notice or relocation happens on the Controlling thread.
//!
//! Results reach players only as [`homes_core::Notice`]s through the
//! configured [`homes_core::Notifier`].

mod error;
mod runtime;

pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{HomesRuntime, RuntimeOptions};

#[cfg(test)]
mod tests;
