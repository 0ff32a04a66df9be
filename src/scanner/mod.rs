//! Scan orchestration.
//!
//! This module handles:
//! - Running the detectors over a batch of events
//! - Async passes over every sport with persistence and counts
//! - The scheduled scan loop

pub mod engine;
pub mod runner;

pub use engine::{detect_batch, DetectionBatch, Detectors};
pub use runner::{PassStatus, PassSummary, Scanner};
