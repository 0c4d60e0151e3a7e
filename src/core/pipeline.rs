//! The processing stage machine.
//!
//! Drives one message through StartProcessing, one or more Thinking steps,
//! response selection, and Complete, emitting an event at each transition.
//! Any failure along the way becomes a single Error event and the caller
//! receives the configured apology instead of the failure detail.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ChatEvent, PipelineRun, RunOutcome, Stage};

use super::classifier::{normalize, Category, Classifier, KeywordClassifier};
use super::notifier::{panic_message, EventBus};
use super::responder::{DelayRange, ResponderConfig};

const START_MESSAGE: &str = "Starting to process message";

/// Failures raised while a run is in progress
#[derive(Debug, Clone, Error)]
pub enum ProcessingError {
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("No responses configured for category '{0}'")]
    EmptyTable(Category),

    #[error("Invalid delay range: {min_ms}ms > {max_ms}ms")]
    InvalidDelay { min_ms: u64, max_ms: u64 },

    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("Run reached completion without a Thinking event")]
    NoThinking,

    #[error("Processing cancelled")]
    Cancelled,
}

/// Processes messages and notifies observers along the way
pub struct ChatPipeline {
    config: ResponderConfig,
    bus: Arc<EventBus>,
    classifier: Arc<dyn Classifier>,
}

impl ChatPipeline {
    /// Create a pipeline using the keyword classifier from `config`
    pub fn new(config: ResponderConfig, bus: EventBus) -> Self {
        let classifier = Arc::new(KeywordClassifier::new(config.keywords.clone()));
        Self {
            config,
            bus: Arc::new(bus),
            classifier,
        }
    }

    /// Replace the classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Text in, text out. Failures come back as the apology.
    pub async fn respond(&self, input: &str) -> String {
        self.process(input).await.into_text()
    }

    /// Run to completion without cancellation
    pub async fn process(&self, input: &str) -> RunOutcome {
        let token = CancellationToken::new();
        let run = self.execute(input, &token).await;
        run.outcome.unwrap_or_else(|| self.failed("run ended without an outcome"))
    }

    /// Run one message and return the full run record.
    ///
    /// The returned run is always finished: its last stage is Complete or
    /// Error and its outcome is set.
    pub async fn execute(&self, input: &str, token: &CancellationToken) -> PipelineRun {
        self.execute_as(Uuid::new_v4(), input, token).await
    }

    /// Like [`execute`](Self::execute), with the run id supplied by the caller
    #[instrument(skip(self, input, token), fields(run_id = %id))]
    pub async fn execute_as(&self, id: Uuid, input: &str, token: &CancellationToken) -> PipelineRun {
        let mut run = PipelineRun::with_id(id, input);
        info!("Processing message");

        match self.drive(&mut run, token).await {
            Ok(response) => {
                info!(elapsed_ms = run.elapsed_ms(), "Run completed");
                run.finish(RunOutcome::Response { text: response });
            }
            Err(e) => {
                error!(error = %e, stage = %run.stage, "Run failed");
                let detail = e.to_string();
                if let Err((from, to)) = run.advance(Stage::Error) {
                    warn!(%from, %to, "Failed run could not record the Error stage");
                }
                self.emit(&mut run, ChatEvent::Error, &format!("An error occurred: {}", detail));
                run.finish(self.failed(&detail));
            }
        }

        run
    }

    async fn drive(&self, run: &mut PipelineRun, token: &CancellationToken) -> Result<String, ProcessingError> {
        let normalized = normalize(&run.input);

        self.transition(run, Stage::StartProcessing, token)?;
        self.emit(run, ChatEvent::StartProcessing, START_MESSAGE);
        let mut thinking = 0usize;

        for step in &self.config.pacing.analysis {
            self.pause(step.delay, token).await?;
            self.transition(run, Stage::Thinking, token)?;
            let status = match &step.status {
                Some(status) => status.clone(),
                None => self.random_thinking_message(),
            };
            self.emit(run, ChatEvent::Thinking, &status);
            thinking += 1;
        }

        let (category, response) = self.select_response(&normalized)?;
        debug!(%category, "Response selected");
        self.transition(run, Stage::ResponseSelected, token)?;

        self.pause(self.config.pacing.compose, token).await?;
        if self.config.emit_diagnostic {
            self.emit(
                run,
                ChatEvent::Thinking,
                &format!("Debug: Generated response: {}", response),
            );
            thinking += 1;
        }

        if thinking == 0 {
            return Err(ProcessingError::NoThinking);
        }
        self.transition(run, Stage::Complete, token)?;
        self.emit(run, ChatEvent::Complete, &response);

        Ok(response)
    }

    /// Classify and pick a response. A panicking classifier fails the run
    /// like any other classification error.
    fn select_response(&self, normalized: &str) -> Result<(Category, String), ProcessingError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let category = self.classifier.classify(normalized)?;
            let response = self.config.responses.pick(category)?.to_string();
            Ok((category, response))
        }))
        .unwrap_or_else(|cause| {
            let message = panic_message(cause.as_ref());
            warn!(panic = %message, "Classifier panicked");
            Err(ProcessingError::Classification(message))
        })
    }

    /// Check cancellation, then advance
    fn transition(&self, run: &mut PipelineRun, next: Stage, token: &CancellationToken) -> Result<(), ProcessingError> {
        if token.is_cancelled() {
            return Err(ProcessingError::Cancelled);
        }
        run.advance(next)
            .map_err(|(from, to)| ProcessingError::InvalidTransition { from, to })
    }

    /// Wait a random duration from `range`, or until cancelled
    async fn pause(&self, range: DelayRange, token: &CancellationToken) -> Result<(), ProcessingError> {
        let delay = range.sample()?;
        if delay == Duration::ZERO {
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ProcessingError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn emit(&self, run: &mut PipelineRun, event: ChatEvent, message: &str) {
        run.events_emitted += 1;
        self.bus.emit(event, message);
    }

    fn random_thinking_message(&self) -> String {
        self.config
            .thinking_messages
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| "Thinking...".to_string())
    }

    fn failed(&self, detail: &str) -> RunOutcome {
        RunOutcome::Failed {
            apology: self.config.apology.clone(),
            detail: detail.to_string(),
        }
    }
}
