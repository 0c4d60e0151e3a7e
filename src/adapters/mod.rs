//! Observer implementations for external sinks.
//!
//! - `file_log`: append-only text log of every event
//! - `presentation`: chat transcript updated on the primary context

pub mod file_log;
pub mod presentation;

pub use file_log::FileLogObserver;
pub use presentation::{ChatBubble, PresentationObserver, Transcript};
