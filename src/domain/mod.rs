//! Domain types for the parley processor.
//!
//! This module contains the core data structures:
//! - Events: Lifecycle tags and payloads delivered to observers
//! - Run: Per-message stage tracking and outcome

pub mod events;
pub mod run;

// Re-export commonly used types
pub use events::{ChatEvent, EventPayload};
pub use run::{PipelineRun, RunOutcome, Stage, StageMark};
