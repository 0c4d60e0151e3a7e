//! parley - Event-driven conversational message processor
//!
//! Processes chat messages through a fixed set of lifecycle stages and
//! reports each stage to any number of observers, without knowing what
//! those observers do.
//!
//! # Architecture
//!
//! - A message runs through a stage machine on a background task
//! - Every stage transition is fanned out synchronously to registered observers
//! - Observers that own foreground state marshal updates onto the primary
//!   context through a single-consumer queue
//! - The final reply is delivered back to the primary context exactly once
//!
//! # Modules
//!
//! - `adapters`: Observer implementations (file log, chat transcript)
//! - `core`: Event bus, pipeline, background runner, primary-context queue
//! - `domain`: Data structures (ChatEvent, PipelineRun, RunOutcome)
//! - `config`: Configuration discovery and loading
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Interactive session
//! parley chat
//!
//! # One message, full run record
//! parley ask "Hello there!" --json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::adapters::{FileLogObserver, PresentationObserver, Transcript};
pub use crate::core::{BackgroundRunner, ChatPipeline, EventBus, Observer, ResponderConfig};
pub use crate::domain::{ChatEvent, EventPayload, PipelineRun, RunOutcome, Stage};
