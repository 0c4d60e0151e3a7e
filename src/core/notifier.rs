//! Synchronous fan-out of events to registered observers.
//!
//! Registration needs `&mut self`, emission only `&self`. Once the bus is
//! handed to a pipeline it sits behind an `Arc`, so the observer list is
//! frozen while any number of runs emit concurrently.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{ChatEvent, EventPayload};

use super::observer::Observer;

/// Ordered list of observers
#[derive(Default, Clone)]
pub struct EventBus {
    observers: Vec<Arc<dyn Observer>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer. Duplicates are kept and notified once per
    /// registration.
    pub fn register(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.register(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver an event to every observer in registration order.
    ///
    /// A panicking observer is logged and skipped; the rest are still
    /// notified. Returns the number of observers that panicked.
    pub fn emit(&self, event: ChatEvent, message: &str) -> usize {
        self.publish(&EventPayload::new(event, message))
    }

    /// Deliver an already-built payload
    pub fn publish(&self, payload: &EventPayload) -> usize {
        debug!(
            event = %payload.event,
            observers = self.observers.len(),
            "Emitting event"
        );

        let mut failures = 0;
        for (index, observer) in self.observers.iter().enumerate() {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                observer.on_event(payload.event, &payload.message)
            }));

            if let Err(cause) = delivered {
                failures += 1;
                warn!(
                    observer = index,
                    event = %payload.event,
                    panic = %panic_message(cause.as_ref()),
                    "Observer panicked while handling event"
                );
            }
        }
        failures
    }
}

pub(crate) fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::observer::FnObserver;
    use std::sync::Mutex;

    fn recorder(log: Arc<Mutex<Vec<String>>>, name: &'static str) -> Arc<dyn Observer> {
        Arc::new(FnObserver::new(move |event: ChatEvent, message: &str| {
            log.lock()
                .unwrap()
                .push(format!("{name}:{event}:{message}"));
        }))
    }

    #[test]
    fn test_emit_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = EventBus::new()
            .with(recorder(log.clone(), "a"))
            .with(recorder(log.clone(), "b"));

        assert_eq!(bus.emit(ChatEvent::Thinking, "hmm"), 0);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:thinking:hmm".to_string(), "b:thinking:hmm".to_string()]
        );
    }

    #[test]
    fn test_duplicate_registration_receives_twice() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let observer = recorder(log.clone(), "dup");
        let mut bus = EventBus::new();
        bus.register(observer.clone());
        bus.register(observer);

        bus.emit(ChatEvent::StartProcessing, "go");

        assert_eq!(bus.len(), 2);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_bus_is_noop() {
        let bus = EventBus::new();
        assert!(bus.is_empty());
        assert_eq!(bus.emit(ChatEvent::Complete, "done"), 0);
    }

    #[test]
    fn test_panicking_observer_is_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = EventBus::new()
            .with(recorder(log.clone(), "before"))
            .with(Arc::new(FnObserver::new(|_: ChatEvent, _: &str| {
                panic!("observer blew up")
            })))
            .with(recorder(log.clone(), "after"));

        let failures = bus.emit(ChatEvent::Error, "boom");

        assert_eq!(failures, 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:error:boom".to_string(), "after:error:boom".to_string()]
        );
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
