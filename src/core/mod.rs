//! Core processing logic.
//!
//! This module contains:
//! - Observer / EventBus: Event fan-out to registered listeners
//! - Classifier / Responder: Category matching and response tables
//! - Pipeline: The per-message stage machine
//! - Primary / Worker: Background runs and handoff to the primary context

pub mod classifier;
pub mod notifier;
pub mod observer;
pub mod pipeline;
pub mod primary;
pub mod responder;
pub mod worker;

// Re-export commonly used types
pub use classifier::{normalize, Category, Classifier, KeywordClassifier};
pub use notifier::EventBus;
pub use observer::{FnObserver, Observer};
pub use pipeline::{ChatPipeline, ProcessingError};
pub use primary::{ContextHandle, PrimaryQueue};
pub use responder::{DelayRange, Keywords, Pacing, ResponderConfig, ResponseTables, ThinkingStep};
pub use worker::{BackgroundRunner, Completion, DeliveryError, RunControl, RunHandle};
