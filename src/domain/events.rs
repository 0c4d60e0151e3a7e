//! Lifecycle events emitted while a message is processed.
//!
//! Events are plain values: a tag plus a human-readable message. They are
//! created at each stage transition and handed to observers; nothing keeps
//! them afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle moments of a single processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatEvent {
    /// The run has started working on the message
    StartProcessing,

    /// Intermediate progress (may occur several times)
    Thinking,

    /// A response was produced; always the last event of a successful run
    #[serde(rename = "processing_complete")]
    Complete,

    /// The run failed; always the last event of a failed run
    Error,
}

impl ChatEvent {
    /// Stable tag used in logs and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartProcessing => "start_processing",
            Self::Thinking => "thinking",
            Self::Complete => "processing_complete",
            Self::Error => "error",
        }
    }

    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event tag paired with its message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event: ChatEvent,

    pub message: String,

    /// When the payload was created
    pub timestamp: DateTime<Utc>,
}

impl EventPayload {
    /// Create a payload stamped with the current time
    pub fn new(event: ChatEvent, message: impl Into<String>) -> Self {
        Self {
            event,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
