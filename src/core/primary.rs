//! Marshaling work onto the primary context.
//!
//! State owned by the primary loop (the chat transcript, for instance) is
//! only ever touched by that loop. Background tasks hand it closures through
//! a [`ContextHandle`]; the loop runs them against its state by draining the
//! matching [`PrimaryQueue`].

use tokio::sync::mpsc;
use tracing::debug;

/// A unit of work to run against primary-owned state
pub type Task<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Create a connected handle/queue pair
pub fn channel<S>() -> (ContextHandle<S>, PrimaryQueue<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ContextHandle { tx }, PrimaryQueue { rx })
}

/// Posts work to the primary context. Cheap to clone, usable from any
/// thread.
pub struct ContextHandle<S> {
    tx: mpsc::UnboundedSender<Task<S>>,
}

impl<S> Clone for ContextHandle<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> ContextHandle<S> {
    /// Queue `f` to run on the primary context. Never blocks, so it is safe
    /// to call from synchronous observer callbacks. Returns false if the
    /// primary queue has been dropped.
    pub fn post<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        let sent = self.tx.send(Box::new(f)).is_ok();
        if !sent {
            debug!("Primary context is gone, dropping posted task");
        }
        sent
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The receiving side, owned by the primary loop
pub struct PrimaryQueue<S> {
    rx: mpsc::UnboundedReceiver<Task<S>>,
}

impl<S> PrimaryQueue<S> {
    /// Wait for the next task and run it. Returns false once every handle
    /// has been dropped and the queue is empty.
    pub async fn next(&mut self, state: &mut S) -> bool {
        match self.rx.recv().await {
            Some(task) => {
                task(state);
                true
            }
            None => false,
        }
    }

    /// Run every task queued right now. Returns how many ran.
    pub fn drain(&mut self, state: &mut S) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task(state);
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_and_drain_in_order() {
        let (handle, mut queue) = channel::<Vec<u32>>();
        let mut state = Vec::new();

        handle.post(|s| s.push(1));
        handle.post(|s| s.push(2));
        assert_eq!(queue.drain(&mut state), 2);
        assert_eq!(state, vec![1, 2]);
        assert_eq!(queue.drain(&mut state), 0);
    }

    #[test]
    fn test_post_after_queue_dropped() {
        let (handle, queue) = channel::<()>();
        drop(queue);
        assert!(handle.is_closed());
        assert!(!handle.post(|_| {}));
    }

    #[tokio::test]
    async fn test_post_from_other_thread() {
        let (handle, mut queue) = channel::<String>();
        let mut state = String::new();

        let worker = std::thread::spawn(move || {
            handle.post(|s| s.push_str("from worker"));
        });
        worker.join().unwrap();

        assert!(queue.next(&mut state).await);
        assert_eq!(state, "from worker");
        // Handle was moved into the thread and dropped with it
        assert!(!queue.next(&mut state).await);
    }
}
