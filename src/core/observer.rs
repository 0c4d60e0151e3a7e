//! The observer capability.

use crate::domain::ChatEvent;

/// Receives lifecycle events from the pipeline.
///
/// Called synchronously from whichever context is running the pipeline,
/// usually a background task. Implementations that touch state owned by
/// another context must marshal the work there themselves (see
/// [`crate::core::primary`]).
pub trait Observer: Send + Sync {
    fn on_event(&self, event: ChatEvent, message: &str);
}

/// Adapts a closure into an [`Observer`]
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(ChatEvent, &str) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Observer for FnObserver<F>
where
    F: Fn(ChatEvent, &str) + Send + Sync,
{
    fn on_event(&self, event: ChatEvent, message: &str) {
        (self.0)(event, message)
    }
}
