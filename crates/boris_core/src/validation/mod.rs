//! Consistency checks over coded observations.
//!
//! # Responsibility
//! - Verify that state behaviors are coded as balanced start/stop pairs.
//!
//! # Invariants
//! - Checks are read-only; they never modify the project.

pub mod state_events;
