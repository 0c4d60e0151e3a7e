//! Background execution of pipeline runs.
//!
//! Each submitted message runs on its own tokio task so the caller's loop
//! stays responsive. Completion is reported exactly once, either through a
//! [`RunHandle`] the caller awaits or as a task posted to the primary
//! context.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, Instrument, Span};
use uuid::Uuid;

use crate::domain::RunOutcome;

use super::pipeline::ChatPipeline;
use super::primary::ContextHandle;

/// A run finished without producing an outcome
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The run task panicked or was aborted
    #[error("Run aborted: {0}")]
    Aborted(String),

    /// The completion channel closed without a value
    #[error("Completion channel closed")]
    Closed,
}

/// What the primary context receives when a run finishes
pub type Completion = Result<RunOutcome, DeliveryError>;

/// Identifies and cancels an in-flight run
#[derive(Debug, Clone)]
pub struct RunControl {
    id: Uuid,
    token: CancellationToken,
    finished: Arc<AtomicBool>,
}

impl RunControl {
    /// Id of the run record, also attached to the run's tracing span
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the run to stop at its next delay or stage boundary. A cancelled
    /// run still emits its Error event and completes with the apology.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the completion has been handed off
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Awaitable completion of a spawned run
#[derive(Debug)]
pub struct RunHandle {
    control: RunControl,
    done: oneshot::Receiver<Completion>,
}

impl RunHandle {
    pub fn id(&self) -> Uuid {
        self.control.id
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Wait for the run to finish
    pub async fn outcome(self) -> Completion {
        self.done.await.unwrap_or(Err(DeliveryError::Closed))
    }
}

/// Spawns pipeline runs onto the tokio runtime
#[derive(Clone)]
pub struct BackgroundRunner {
    pipeline: Arc<ChatPipeline>,
}

impl BackgroundRunner {
    pub fn new(pipeline: ChatPipeline) -> Self {
        Self::from_shared(Arc::new(pipeline))
    }

    pub fn from_shared(pipeline: Arc<ChatPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<ChatPipeline> {
        &self.pipeline
    }

    /// Start a run and return immediately. Must be called from within a
    /// tokio runtime.
    pub fn spawn(&self, input: impl Into<String>) -> RunHandle {
        let (tx, rx) = oneshot::channel();
        let control = self.launch(input.into(), move |completion| {
            // The handle may have been dropped; nobody is waiting then.
            let _ = tx.send(completion);
        });
        RunHandle { control, done: rx }
    }

    /// Start a run whose completion is handed to `on_done` on the primary
    /// context, against the primary-owned state.
    pub fn spawn_into<S, F>(&self, input: impl Into<String>, context: &ContextHandle<S>, on_done: F) -> RunControl
    where
        S: 'static,
        F: FnOnce(&mut S, Completion) + Send + 'static,
    {
        let context = context.clone();
        self.launch(input.into(), move |completion| {
            context.post(move |state| on_done(state, completion));
        })
    }

    /// Run on a task, supervised by a second task that turns a panic into
    /// `DeliveryError::Aborted` so `deliver` is called exactly once.
    fn launch<D>(&self, input: String, deliver: D) -> RunControl
    where
        D: FnOnce(Completion) + Send + 'static,
    {
        let control = RunControl {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
            finished: Arc::new(AtomicBool::new(false)),
        };

        let pipeline = Arc::clone(&self.pipeline);
        let id = control.id;
        let token = control.token.clone();
        let span = tracing::info_span!("background_run", run_id = %id);

        supervise(
            async move {
                let run = pipeline.execute_as(id, &input, &token).await;
                run.outcome.ok_or(DeliveryError::Closed)
            },
            span,
            {
                let finished = Arc::clone(&control.finished);
                move |completion: Completion| {
                    finished.store(true, Ordering::Release);
                    deliver(completion);
                }
            },
        );

        control
    }
}

/// Spawn `work`, plus a watcher that hands its result (or its panic, as
/// `DeliveryError::Aborted`) to `deliver`.
fn supervise<W, D>(work: W, span: Span, deliver: D)
where
    W: Future<Output = Completion> + Send + 'static,
    D: FnOnce(Completion) + Send + 'static,
{
    let task = tokio::spawn(work.instrument(span.clone()));

    tokio::spawn(
        async move {
            let completion = match task.await {
                Ok(completion) => completion,
                Err(e) => {
                    error!(error = %e, "Background run did not finish");
                    Err(DeliveryError::Aborted(e.to_string()))
                }
            };
            debug!(success = completion.as_ref().map(|o| o.is_success()).unwrap_or(false), "Delivering completion");
            deliver(completion);
        }
        .instrument(span),
    );
}
