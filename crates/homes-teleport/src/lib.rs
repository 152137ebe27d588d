//! Delayed relocation.
//!
//! A subject asked to relocate waits for a delay first. Moving, leaving, or
//! starting another relocation during the wait cancels it. Each subject has
//! at most one relocation pending.

mod scheduler;

pub use scheduler::{RelocationScheduler, DEFAULT_TELEPORT_DELAY};
