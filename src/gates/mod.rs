//! Decision gate: suspend a stage on ambiguity, wait for a human choice,
//! persist it, and hand control back for a single re-run.
//!
//! The gate moves through a fixed cycle:
//!
//! ```text
//! Running -> Ambiguous -> AwaitingInput -> Resolved -> ReRunning -> Running
//! ```
//!
//! Any other transition is a programming error.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::store::ArtifactStore;

mod record;
mod source;

pub use record::{parse_choice, parse_summary, persist_decision, recorded_choice, render_decision};
pub use source::{
    DecisionSource, FileDecisionSource, PromptDecisionSource, ScriptedDecisionSource,
    answer_pending, match_option, pending_requests,
};

/// How long a run waits for a human before giving up.
pub const DECISION_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// A stage's request for a human choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub stage: String,
    pub summary: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Running,
    Ambiguous,
    AwaitingInput,
    Resolved,
    ReRunning,
}

impl GateState {
    pub fn can_transition_to(self, next: GateState) -> bool {
        use GateState::*;
        matches!(
            (self, next),
            (Running, Ambiguous)
                | (Ambiguous, AwaitingInput)
                | (AwaitingInput, Resolved)
                | (Resolved, ReRunning)
                | (ReRunning, Running)
        )
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateState::Running => "running",
            GateState::Ambiguous => "ambiguous",
            GateState::AwaitingInput => "awaiting-input",
            GateState::Resolved => "resolved",
            GateState::ReRunning => "re-running",
        };
        f.write_str(name)
    }
}

/// Drives one decision from request to persisted choice.
pub struct DecisionGate<'a> {
    store: &'a dyn ArtifactStore,
    source: &'a dyn DecisionSource,
    timeout: Duration,
    state: GateState,
}

impl<'a> DecisionGate<'a> {
    pub fn new(store: &'a dyn ArtifactStore, source: &'a dyn DecisionSource) -> Self {
        Self {
            store,
            source,
            timeout: DECISION_TIMEOUT,
            state: GateState::Running,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    fn advance(&mut self, next: GateState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::Other(anyhow::anyhow!(
                "illegal decision gate transition: {} -> {}",
                self.state,
                next
            )));
        }
        tracing::debug!(from = %self.state, to = %next, "decision gate transition");
        self.state = next;
        Ok(())
    }

    /// Wait for a choice and persist it as `decisions/<slug>.md`.
    ///
    /// Leaves the gate in `Resolved`. On timeout nothing is written and the
    /// gate stays in `AwaitingInput`.
    pub async fn resolve(&mut self, request: &DecisionRequest) -> Result<String, PipelineError> {
        self.advance(GateState::Ambiguous)?;
        tracing::info!(
            stage = %request.stage,
            summary = %request.summary,
            options = ?request.options,
            "decision required"
        );

        self.advance(GateState::AwaitingInput)?;
        let choice = match tokio::time::timeout(self.timeout, self.source.choose(request)).await {
            Ok(choice) => choice?,
            Err(_) => {
                tracing::error!(
                    summary = %request.summary,
                    waited_secs = self.timeout.as_secs(),
                    "timed out waiting for decision"
                );
                return Err(PipelineError::DecisionTimeout {
                    summary: request.summary.clone(),
                    waited: self.timeout,
                });
            }
        };

        persist_decision(self.store, &request.summary, &choice)?;
        self.advance(GateState::Resolved)?;
        Ok(choice)
    }

    /// Mark the start of the single re-run that follows a resolution.
    pub fn begin_rerun(&mut self) -> Result<(), PipelineError> {
        self.advance(GateState::ReRunning)
    }

    /// Mark the re-run as completed.
    pub fn finish_rerun(&mut self) -> Result<(), PipelineError> {
        self.advance(GateState::Running)
    }
}
