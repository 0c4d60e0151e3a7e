//! Presentation-layer observer and the transcript it renders into.
//!
//! The transcript belongs to the primary context. The observer runs on
//! whatever task drives the pipeline, so it never touches the transcript
//! itself: it posts each event to the primary queue and the primary loop
//! appends the bubble.

use chrono::Local;

use crate::core::primary::ContextHandle;
use crate::core::Observer;
use crate::domain::ChatEvent;

pub const SENDER_EVENT: &str = "Event";
pub const SENDER_USER: &str = "You";
pub const SENDER_BOT: &str = "Bot";

/// One rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatBubble {
    pub sender: String,

    /// Local wall-clock time, `HH:MM:SS`
    pub time: String,

    pub text: String,
}

impl ChatBubble {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            time: Local::now().format("%H:%M:%S").to_string(),
            text: text.into(),
        }
    }

    pub fn render(&self) -> String {
        format!("{} ({})\n{}", self.sender, self.time, self.text)
    }
}

/// Text shown for an event, with its marker
pub fn event_text(event: ChatEvent, message: &str) -> String {
    match event {
        ChatEvent::StartProcessing => format!("🤔 Processing your message: {}", message),
        ChatEvent::Thinking => format!("💭 {}", message),
        ChatEvent::Error => format!("❌ Error: {}", message),
        ChatEvent::Complete => format!("✅ Response ready: {}", message),
    }
}

/// Primary-owned message history
#[derive(Debug, Default)]
pub struct Transcript {
    bubbles: Vec<ChatBubble>,
    rendered: usize,
    pending_replies: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bubble: ChatBubble) {
        self.bubbles.push(bubble);
    }

    /// Record a submitted user message that awaits a reply
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(ChatBubble::new(SENDER_USER, text));
        self.pending_replies += 1;
    }

    /// Record the reply to an earlier user message
    pub fn push_reply(&mut self, bubble: ChatBubble) {
        self.push(bubble);
        self.pending_replies = self.pending_replies.saturating_sub(1);
    }

    pub fn pending_replies(&self) -> usize {
        self.pending_replies
    }

    pub fn bubbles(&self) -> &[ChatBubble] {
        &self.bubbles
    }

    /// Bubbles added since the previous call
    pub fn take_unrendered(&mut self) -> &[ChatBubble] {
        let start = self.rendered;
        self.rendered = self.bubbles.len();
        &self.bubbles[start..]
    }
}

/// Observer that mirrors events into the primary context's [`Transcript`]
pub struct PresentationObserver {
    context: ContextHandle<Transcript>,
}

impl PresentationObserver {
    pub fn new(context: ContextHandle<Transcript>) -> Self {
        Self { context }
    }
}

impl Observer for PresentationObserver {
    fn on_event(&self, event: ChatEvent, message: &str) {
        let bubble = ChatBubble::new(SENDER_EVENT, event_text(event, message));
        self.context.post(move |transcript| transcript.push(bubble));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::primary;

    #[test]
    fn test_event_markers() {
        assert_eq!(
            event_text(ChatEvent::StartProcessing, "go"),
            "🤔 Processing your message: go"
        );
        assert_eq!(event_text(ChatEvent::Thinking, "hmm"), "💭 hmm");
        assert_eq!(event_text(ChatEvent::Error, "bad"), "❌ Error: bad");
        assert_eq!(event_text(ChatEvent::Complete, "Hi!"), "✅ Response ready: Hi!");
    }

    #[test]
    fn test_bubble_render() {
        let bubble = ChatBubble {
            sender: "Bot".to_string(),
            time: "12:34:56".to_string(),
            text: "Hello!".to_string(),
        };
        assert_eq!(bubble.render(), "Bot (12:34:56)\nHello!");
    }

    #[test]
    fn test_observer_only_mutates_through_queue() {
        let (handle, mut queue) = primary::channel();
        let observer = PresentationObserver::new(handle);
        let mut transcript = Transcript::new();

        observer.on_event(ChatEvent::Thinking, "Analyzing sentiment...");
        assert!(transcript.bubbles().is_empty());

        assert_eq!(queue.drain(&mut transcript), 1);
        assert_eq!(transcript.bubbles().len(), 1);
        assert_eq!(transcript.bubbles()[0].sender, SENDER_EVENT);
        assert_eq!(transcript.bubbles()[0].text, "💭 Analyzing sentiment...");
    }

    #[test]
    fn test_take_unrendered() {
        let mut transcript = Transcript::new();
        transcript.push(ChatBubble::new(SENDER_USER, "hi"));
        assert_eq!(transcript.take_unrendered().len(), 1);
        assert!(transcript.take_unrendered().is_empty());

        transcript.push(ChatBubble::new(SENDER_BOT, "Hello!"));
        let fresh = transcript.take_unrendered();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].text, "Hello!");
    }

    #[test]
    fn test_pending_replies() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.push_user("bye");
        assert_eq!(transcript.pending_replies(), 2);

        transcript.push(ChatBubble::new(SENDER_EVENT, "💭 hmm"));
        assert_eq!(transcript.pending_replies(), 2);

        transcript.push_reply(ChatBubble::new(SENDER_BOT, "Hello!"));
        assert_eq!(transcript.pending_replies(), 1);
        assert_eq!(transcript.bubbles()[0].sender, SENDER_USER);
    }
}
