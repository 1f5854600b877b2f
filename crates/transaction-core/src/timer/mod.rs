//! Transaction timers.
//!
//! - [`TimerType`]: the RFC 3261 timer names used in log output
//! - [`TimerSettings`]: durations, defaulting to the RFC values
//! - `TimerSlot`: a cancellable one-shot timer a transaction owns

mod slot;
pub mod types;

pub(crate) use slot::TimerSlot;
pub use types::{TimerSettings, TimerType, T1, T2, T4};
