//! Response category classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pipeline::ProcessingError;
use super::responder::Keywords;

/// Which response table a message draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Greeting,
    Farewell,
    Default,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
            Self::Default => "default",
        };
        f.write_str(name)
    }
}

/// Maps normalized input to a category
pub trait Classifier: Send + Sync {
    /// `normalized` is already trimmed and lowercased
    fn classify(&self, normalized: &str) -> Result<Category, ProcessingError>;
}

/// Substring keyword matching. Greeting keywords are checked before
/// farewell keywords, so a message containing both is a greeting.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Keywords,
}

impl KeywordClassifier {
    pub fn new(keywords: Keywords) -> Self {
        Self { keywords }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(Keywords::default())
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, normalized: &str) -> Result<Category, ProcessingError> {
        let contains_any = |words: &[String]| words.iter().any(|w| normalized.contains(w.as_str()));

        if contains_any(self.keywords.greeting.as_slice()) {
            Ok(Category::Greeting)
        } else if contains_any(self.keywords.farewell.as_slice()) {
            Ok(Category::Farewell)
        } else {
            Ok(Category::Default)
        }
    }
}

/// Trim and lowercase for matching
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(input: &str) -> Category {
        KeywordClassifier::default()
            .classify(&normalize(input))
            .unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  BYE bye  "), "bye bye");
        assert_eq!(normalize("\tHello\n"), "hello");
    }

    #[test]
    fn test_greeting() {
        assert_eq!(classify("Hello there!"), Category::Greeting);
        assert_eq!(classify("hey you"), Category::Greeting);
        assert_eq!(classify("Greetings, traveller"), Category::Greeting);
    }

    #[test]
    fn test_farewell() {
        assert_eq!(classify("  BYE bye  "), Category::Farewell);
        assert_eq!(classify("See you tomorrow"), Category::Farewell);
        assert_eq!(classify("farewell"), Category::Farewell);
    }

    #[test]
    fn test_greeting_wins_over_farewell() {
        assert_eq!(classify("hello and goodbye"), Category::Greeting);
        assert_eq!(classify("bye, hey"), Category::Greeting);
    }

    #[test]
    fn test_default() {
        assert_eq!(classify("What's the weather?"), Category::Default);
        assert_eq!(classify(""), Category::Default);
    }

    #[test]
    fn test_substring_matching() {
        // "hi" is a substring of "this", so it matches like any other keyword
        assert_eq!(classify("this works"), Category::Greeting);
    }

    #[test]
    fn test_custom_keywords() {
        let classifier = KeywordClassifier::new(Keywords {
            greeting: vec!["ahoy".to_string()],
            farewell: vec!["ciao".to_string()],
        });
        assert_eq!(classifier.classify("ahoy matey").unwrap(), Category::Greeting);
        assert_eq!(classifier.classify("ciao").unwrap(), Category::Farewell);
        assert_eq!(classifier.classify("hello").unwrap(), Category::Default);
    }
}
