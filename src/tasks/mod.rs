// src/tasks/mod.rs

// Concrete behavioural tasks built on the trial-timing core.
// Each task is feature-gated so downstream crates enable only what they use.

pub mod sdk;
pub use sdk::*;

#[cfg(feature = "task-dpa")]
pub mod dpa;

#[cfg(feature = "task-motion")]
pub mod motion;
