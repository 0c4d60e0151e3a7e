//! Run state for a single message.
//!
//! A PipelineRun lives for one call to the pipeline: it tracks the current
//! stage, when each stage was entered, and the terminal outcome.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stages a run moves through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Input accepted, nothing emitted yet
    Received,

    /// StartProcessing has been emitted
    StartProcessing,

    /// At least one Thinking event has been emitted
    Thinking,

    /// A response has been chosen
    ResponseSelected,

    /// Complete has been emitted
    Complete,

    /// Error has been emitted
    Error,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Whether `next` is a legal successor of this stage.
    ///
    /// Error is reachable from every non-terminal stage. StartProcessing may
    /// jump to ResponseSelected when no analysis steps are configured.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Stage::Error {
            return true;
        }

        matches!(
            (self, next),
            (Stage::Received, Stage::StartProcessing)
                | (Stage::StartProcessing, Stage::Thinking)
                | (Stage::StartProcessing, Stage::ResponseSelected)
                | (Stage::Thinking, Stage::Thinking)
                | (Stage::Thinking, Stage::ResponseSelected)
                | (Stage::ResponseSelected, Stage::Complete)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::StartProcessing => "start_processing",
            Self::Thinking => "thinking",
            Self::ResponseSelected => "response_selected",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Terminal result of a run: a response or a failure, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunOutcome {
    /// The chosen response
    Response { text: String },

    /// The run failed. `apology` is what the caller sees; `detail` is the
    /// internal error, also carried by the Error event.
    Failed { apology: String, detail: String },
}

impl RunOutcome {
    /// Caller-facing text. Never contains failure detail.
    pub fn text(&self) -> &str {
        match self {
            Self::Response { text } => text,
            Self::Failed { apology, .. } => apology,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Response { text } => text,
            Self::Failed { apology, .. } => apology,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Response { .. })
    }
}

/// Time a stage was entered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMark {
    pub stage: Stage,
    pub at: DateTime<Utc>,
}

/// One invocation of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Raw input as submitted
    pub input: String,

    /// Current stage
    pub stage: Stage,

    /// Every stage entered, in order, starting with Received
    pub stages: Vec<StageMark>,

    /// Number of events emitted so far
    pub events_emitted: usize,

    /// Set once the run reaches a terminal stage
    pub outcome: Option<RunOutcome>,
}

impl PipelineRun {
    /// Create a run in the Received stage
    pub fn new(input: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), input)
    }

    /// Create a run under an id chosen by the caller
    pub fn with_id(id: Uuid, input: impl Into<String>) -> Self {
        Self {
            id,
            input: input.into(),
            stage: Stage::Received,
            stages: vec![StageMark {
                stage: Stage::Received,
                at: Utc::now(),
            }],
            events_emitted: 0,
            outcome: None,
        }
    }

    /// Move to `next`, recording the time. Returns the rejected pair when the
    /// transition is not legal; the stage is left unchanged in that case.
    pub fn advance(&mut self, next: Stage) -> Result<(), (Stage, Stage)> {
        if !self.stage.can_advance_to(next) {
            return Err((self.stage, next));
        }

        self.stage = next;
        self.stages.push(StageMark {
            stage: next,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Record the terminal outcome
    pub fn finish(&mut self, outcome: RunOutcome) {
        self.outcome = Some(outcome);
    }

    pub fn is_finished(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Elapsed time between Received and the latest stage
    pub fn elapsed_ms(&self) -> i64 {
        match (self.stages.first(), self.stages.last()) {
            (Some(first), Some(last)) => (last.at - first.at).num_milliseconds(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_creation() {
        let run = PipelineRun::new("hello");
        assert_eq!(run.stage, Stage::Received);
        assert_eq!(run.stages.len(), 1);
        assert!(run.outcome.is_none());
        assert!(!run.is_finished());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut run = PipelineRun::new("hello");
        for stage in [
            Stage::StartProcessing,
            Stage::Thinking,
            Stage::Thinking,
            Stage::ResponseSelected,
            Stage::Complete,
        ] {
            run.advance(stage).unwrap();
        }

        assert!(run.is_finished());
        assert_eq!(run.stages.len(), 6);
        assert!(run.elapsed_ms() >= 0);
    }

    #[test]
    fn test_no_skipping_or_reentry() {
        let mut run = PipelineRun::new("hello");
        assert_eq!(
            run.advance(Stage::Thinking),
            Err((Stage::Received, Stage::Thinking))
        );
        assert_eq!(run.stage, Stage::Received);

        run.advance(Stage::StartProcessing).unwrap();
        assert!(run.advance(Stage::StartProcessing).is_err());
        assert!(run.advance(Stage::Complete).is_err());
    }

    #[test]
    fn test_error_reachable_from_non_terminal() {
        for stage in [
            Stage::Received,
            Stage::StartProcessing,
            Stage::Thinking,
            Stage::ResponseSelected,
        ] {
            assert!(stage.can_advance_to(Stage::Error), "{stage}");
        }
        assert!(!Stage::Complete.can_advance_to(Stage::Error));
        assert!(!Stage::Error.can_advance_to(Stage::Error));
    }

    #[test]
    fn test_outcome_text_hides_detail() {
        let failed = RunOutcome::Failed {
            apology: "Sorry".to_string(),
            detail: "classifier exploded".to_string(),
        };
        assert_eq!(failed.text(), "Sorry");
        assert!(!failed.is_success());

        let ok = RunOutcome::Response {
            text: "Hi there!".to_string(),
        };
        assert_eq!(ok.into_text(), "Hi there!");
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = RunOutcome::Response {
            text: "Hi".to_string(),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "response");
        assert_eq!(json["text"], "Hi");
    }
}
