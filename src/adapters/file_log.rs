//! Durable event log.
//!
//! Appends one line per event to a text sink:
//! `<timestamp> - <LEVEL> - Event: <tag> - Message: <message>`

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::warn;

use crate::core::Observer;
use crate::domain::ChatEvent;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Observer that writes every event to an append-only sink
pub struct FileLogObserver {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl FileLogObserver {
    /// Log to any writer
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(writer)),
        }
    }

    /// Open `path` in append mode, creating it and its parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open event log: {}", path.display()))?;

        Ok(Self::new(file))
    }
}

/// Format a single log line (without trailing newline)
pub fn format_line(timestamp: &str, event: ChatEvent, message: &str) -> String {
    let level = match event {
        ChatEvent::Error => "ERROR",
        _ => "INFO",
    };
    format!("{} - {} - Event: {} - Message: {}", timestamp, level, event, message)
}

impl Observer for FileLogObserver {
    fn on_event(&self, event: ChatEvent, message: &str) {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let line = format_line(&timestamp, event, message);

        let mut sink = match self.sink.lock() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Err(e) = writeln!(sink, "{}", line).and_then(|_| sink.flush()) {
            warn!(error = %e, %event, "Failed to write event log line");
        }
    }
}
