//! Update orchestration layer
//!
//! # Modules
//!
//! - [`orchestrator`]: Phased run over all drivers and the resulting report
//! - [`executor`]: Download, extract, install and cleanup steps for one driver
//! - [`state`]: Per-driver scratch state owned by the orchestrator
//! - [`report`]: Comparison table rendering
//! - [`error`]: Per-step and per-driver error types

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod report;
pub mod state;

pub use orchestrator::{DriverFailure, Gate, Orchestrator, RunReport};
