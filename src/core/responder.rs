//! Responder configuration: response tables, keywords, and pacing.
//!
//! Everything here is plain data loaded from YAML (see [`crate::config`]).
//! Every field has a default so partial files are valid.

use std::time::Duration;

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::classifier::Category;
use super::pipeline::ProcessingError;

/// Complete responder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Candidate responses per category
    #[serde(default)]
    pub responses: ResponseTables,

    /// Keywords used by the default classifier
    #[serde(default)]
    pub keywords: Keywords,

    /// Status texts picked at random by analysis steps without a fixed status
    #[serde(default = "default_thinking_messages")]
    pub thinking_messages: Vec<String>,

    /// Delays between stages
    #[serde(default)]
    pub pacing: Pacing,

    /// Emit a Thinking event carrying the chosen response before Complete
    #[serde(default = "default_true")]
    pub emit_diagnostic: bool,

    /// What the caller gets back when a run fails
    #[serde(default = "default_apology")]
    pub apology: String,
}

fn default_true() -> bool {
    true
}

fn default_apology() -> String {
    "I apologize, but I encountered an error while processing your message.".to_string()
}

fn default_thinking_messages() -> Vec<String> {
    strings(&[
        "Analyzing your message...",
        "Processing that information...",
        "Considering the best response...",
        "Computing an appropriate reply...",
    ])
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            responses: ResponseTables::default(),
            keywords: Keywords::default(),
            thinking_messages: default_thinking_messages(),
            pacing: Pacing::default(),
            emit_diagnostic: true,
            apology: default_apology(),
        }
    }
}

impl ResponderConfig {
    /// Parse from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Same configuration with every delay set to zero
    pub fn without_delays(mut self) -> Self {
        self.pacing = self.pacing.zeroed();
        self
    }

    /// Validate tables, keyword lists, and pacing
    pub fn validate(&self) -> Result<()> {
        for category in [Category::Greeting, Category::Farewell, Category::Default] {
            if self.responses.table(category).is_empty() {
                anyhow::bail!("Response table '{}' cannot be empty", category);
            }
        }

        if self.keywords.greeting.iter().chain(&self.keywords.farewell).any(|k| k.is_empty()) {
            anyhow::bail!("Keywords cannot be empty strings");
        }

        if self.pacing.analysis.is_empty() && !self.emit_diagnostic {
            anyhow::bail!("At least one analysis step is required when the diagnostic event is disabled");
        }

        let needs_messages = self.pacing.analysis.iter().any(|s| s.status.is_none());
        if needs_messages && self.thinking_messages.is_empty() {
            anyhow::bail!("thinking_messages cannot be empty when an analysis step has no status");
        }

        for range in self
            .pacing
            .analysis
            .iter()
            .map(|s| &s.delay)
            .chain(std::iter::once(&self.pacing.compose))
        {
            range.check()?;
        }

        Ok(())
    }
}

/// Candidate responses per category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTables {
    #[serde(default = "default_greeting_responses")]
    pub greeting: Vec<String>,

    #[serde(default = "default_farewell_responses")]
    pub farewell: Vec<String>,

    #[serde(default = "default_default_responses")]
    pub default: Vec<String>,
}

fn default_greeting_responses() -> Vec<String> {
    strings(&[
        "Hello! How can I assist you today?",
        "Hi there! What's on your mind?",
        "Greetings! How may I help you?",
    ])
}

fn default_farewell_responses() -> Vec<String> {
    strings(&[
        "Goodbye! Have a great day!",
        "See you later! Take care!",
        "Bye for now! Feel free to come back anytime!",
    ])
}

fn default_default_responses() -> Vec<String> {
    strings(&[
        "Interesting point! Let me think about that...",
        "I understand what you're saying. Here's what I think...",
        "That's a good question. From my perspective...",
        "Let me process that for a moment...",
    ])
}

impl Default for ResponseTables {
    fn default() -> Self {
        Self {
            greeting: default_greeting_responses(),
            farewell: default_farewell_responses(),
            default: default_default_responses(),
        }
    }
}

impl ResponseTables {
    pub fn table(&self, category: Category) -> &[String] {
        match category {
            Category::Greeting => &self.greeting,
            Category::Farewell => &self.farewell,
            Category::Default => &self.default,
        }
    }

    /// Pick one response uniformly at random
    pub fn pick(&self, category: Category) -> Result<&str, ProcessingError> {
        self.table(category)
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .ok_or(ProcessingError::EmptyTable(category))
    }
}

/// Keyword lists for [`super::classifier::KeywordClassifier`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keywords {
    #[serde(default = "default_greeting_keywords")]
    pub greeting: Vec<String>,

    #[serde(default = "default_farewell_keywords")]
    pub farewell: Vec<String>,
}

fn default_greeting_keywords() -> Vec<String> {
    strings(&["hello", "hi", "hey", "greetings"])
}

fn default_farewell_keywords() -> Vec<String> {
    strings(&["bye", "goodbye", "see you", "farewell"])
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            greeting: default_greeting_keywords(),
            farewell: default_farewell_keywords(),
        }
    }
}

/// Simulated latency between stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pacing {
    /// Steps before classification; each is a delay followed by a Thinking event
    #[serde(default = "default_analysis_steps")]
    pub analysis: Vec<ThinkingStep>,

    /// Delay between picking the response and completing
    #[serde(default = "default_compose_delay")]
    pub compose: DelayRange,
}

fn default_analysis_steps() -> Vec<ThinkingStep> {
    vec![
        ThinkingStep {
            delay: DelayRange::new(500, 5000),
            status: None,
        },
        ThinkingStep {
            delay: DelayRange::new(500, 3000),
            status: Some("Analyzing sentiment...".to_string()),
        },
    ]
}

fn default_compose_delay() -> DelayRange {
    DelayRange::new(500, 1000)
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            analysis: default_analysis_steps(),
            compose: default_compose_delay(),
        }
    }
}

impl Pacing {
    /// Keep the steps and their statuses, drop all waiting
    pub fn zeroed(mut self) -> Self {
        for step in &mut self.analysis {
            step.delay = DelayRange::ZERO;
        }
        self.compose = DelayRange::ZERO;
        self
    }
}

/// One delay-then-Thinking step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingStep {
    pub delay: DelayRange,

    /// Fixed status text; when absent one of `thinking_messages` is used
    #[serde(default)]
    pub status: Option<String>,
}

/// Inclusive range of milliseconds to wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn check(&self) -> Result<(), ProcessingError> {
        if self.min_ms > self.max_ms {
            return Err(ProcessingError::InvalidDelay {
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }

    /// Draw a duration uniformly from the range
    pub fn sample(&self) -> Result<Duration, ProcessingError> {
        self.check()?;
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResponderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pacing.analysis.len(), 2);
        assert_eq!(config.pacing.analysis[0].delay, DelayRange::new(500, 5000));
        assert_eq!(config.pacing.compose, DelayRange::new(500, 1000));
        assert!(config.emit_diagnostic);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
responses:
  greeting:
    - "Ahoy!"
pacing:
  compose: { min_ms: 0, max_ms: 10 }
"#;
        let config = ResponderConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.responses.greeting, vec!["Ahoy!".to_string()]);
        assert_eq!(config.responses.farewell.len(), 3);
        assert_eq!(config.pacing.analysis.len(), 2);
        assert_eq!(config.pacing.compose, DelayRange::new(0, 10));
        assert_eq!(config.keywords.greeting[0], "hello");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_table_fails_validation() {
        let mut config = ResponderConfig::default();
        config.responses.farewell.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("farewell"));
    }

    #[test]
    fn test_inverted_delay_fails_validation() {
        let mut config = ResponderConfig::default();
        config.pacing.compose = DelayRange::new(10, 5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_thinking_at_all_fails_validation() {
        let mut config = ResponderConfig::default();
        config.pacing.analysis.clear();
        config.emit_diagnostic = false;
        assert!(config.validate().is_err());

        config.emit_diagnostic = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_without_delays_keeps_steps() {
        let config = ResponderConfig::default().without_delays();
        assert_eq!(config.pacing.analysis.len(), 2);
        assert!(config
            .pacing
            .analysis
            .iter()
            .all(|s| s.delay == DelayRange::ZERO));
        assert_eq!(
            config.pacing.analysis[1].status.as_deref(),
            Some("Analyzing sentiment...")
        );
        assert_eq!(config.pacing.compose, DelayRange::ZERO);
    }

    #[test]
    fn test_delay_sampling_stays_in_range() {
        let range = DelayRange::new(5, 20);
        for _ in 0..100 {
            let d = range.sample().unwrap();
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(20));
        }
        assert_eq!(DelayRange::ZERO.sample().unwrap(), Duration::ZERO);
        assert!(DelayRange::new(3, 1).sample().is_err());
    }

    #[test]
    fn test_pick_from_table() {
        let tables = ResponseTables::default();
        let picked = tables.pick(Category::Greeting).unwrap();
        assert!(tables.greeting.iter().any(|r| r == picked));

        let empty = ResponseTables {
            default: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            empty.pick(Category::Default),
            Err(ProcessingError::EmptyTable(Category::Default))
        ));
    }
}
