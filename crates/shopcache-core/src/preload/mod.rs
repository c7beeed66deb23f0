//! Preloading reference data after login.
//!
//! - `steps`: the per-role step registry
//! - `state`: run state, events and the reducer folding them
//! - `orchestrator`: `DataStore::run`, which drives a run against the data source

pub mod orchestrator;
pub mod state;
pub mod steps;

pub use state::{progress_for, PreloadEvent, PreloadSnapshot, PreloadState, PreloadStatus, StepOutcome};
pub use steps::{compute_steps, plan, LoadStep, StepStatus};
