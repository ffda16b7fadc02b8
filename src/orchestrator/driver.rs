use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use super::summary::{ResolvedDecision, RunSummary, StageRun};
use crate::errors::PipelineError;
use crate::gates::{DECISION_TIMEOUT, DecisionGate, DecisionSource};
use crate::generate::Generator;
use crate::notify::Notifier;
use crate::stage::{Stage, StageExecutor, StageOutcome};
use crate::store::ArtifactStore;
use crate::templates::PromptLibrary;
use crate::ui::PipelineUI;

/// Gate-aware pipeline driver.
///
/// The driver is the only place that reacts to
/// [`StageOutcome::NeedsDecision`]: it notifies, waits on the decision gate,
/// and re-runs the stage exactly once.
pub struct Pipeline {
    store: Arc<dyn ArtifactStore>,
    generator: Arc<dyn Generator>,
    decisions: Arc<dyn DecisionSource>,
    prompts: PromptLibrary,
    notifier: Notifier,
    decision_timeout: Duration,
    ui: Option<Arc<PipelineUI>>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        generator: Arc<dyn Generator>,
        decisions: Arc<dyn DecisionSource>,
    ) -> Self {
        Self {
            store,
            generator,
            decisions,
            prompts: PromptLibrary::bundled(),
            notifier: Notifier::disabled(),
            decision_timeout: DECISION_TIMEOUT,
            ui: None,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }

    pub fn with_ui(mut self, ui: Arc<PipelineUI>) -> Self {
        self.ui = Some(ui);
        self
    }

    /// Run every stage in order, starting with `bootstrap`.
    pub async fn run_all(&self) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.run_all_inner(run_id).instrument(span).await
    }

    async fn run_all_inner(&self, run_id: Uuid) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        let mut summary = RunSummary::new(run_id);

        for stage in Stage::ALL {
            tracing::info!(%stage, "starting stage");
            let run = self.run_stage(stage).await?;
            summary.record(run);
        }

        self.notifier.notify("Pipeline run completed.");
        tracing::info!(
            stages = summary.stages.len(),
            decisions = summary.decisions.len(),
            "run completed"
        );
        if let Some(ui) = &self.ui {
            ui.finish(summary.stages.len(), summary.decisions.len(), start.elapsed());
        }
        Ok(summary)
    }

    /// Run a single stage, resolving at most one decision along the way.
    pub async fn run_stage(&self, stage: Stage) -> Result<StageRun, PipelineError> {
        let start = Instant::now();
        let result = self.run_gated(stage).await;
        if let Some(ui) = &self.ui {
            match &result {
                Ok(run) => ui.stage_complete(&run.report, start.elapsed()),
                Err(e) => ui.stage_failed(stage, &e.to_string()),
            }
        }
        result
    }

    async fn run_gated(&self, stage: Stage) -> Result<StageRun, PipelineError> {
        let executor =
            StageExecutor::new(self.store.as_ref(), self.generator.as_ref(), &self.prompts);

        let request = match self.execute(&executor, stage).await? {
            StageOutcome::Completed(report) => {
                return Ok(StageRun {
                    report,
                    decision: None,
                });
            }
            StageOutcome::NeedsDecision(request) => request,
        };

        self.notifier
            .notify(&format!("Decision required: {}", request.summary));
        if let Some(ui) = &self.ui {
            ui.decision_required(&request);
        }

        let mut gate = DecisionGate::new(self.store.as_ref(), self.decisions.as_ref())
            .with_timeout(self.decision_timeout);
        let choice = gate.resolve(&request).await?;
        tracing::info!(summary = %request.summary, %choice, "decision received");
        if let Some(ui) = &self.ui {
            ui.decision_recorded(stage, &choice);
        }

        gate.begin_rerun()?;
        match self.execute(&executor, stage).await? {
            StageOutcome::Completed(report) => {
                gate.finish_rerun()?;
                Ok(StageRun {
                    report,
                    decision: Some(ResolvedDecision {
                        stage,
                        summary: request.summary,
                        choice,
                    }),
                })
            }
            StageOutcome::NeedsDecision(again) => Err(PipelineError::UnresolvedDecision {
                stage: stage.name().to_string(),
                summary: again.summary,
            }),
        }
    }

    /// One stage invocation, with the elapsed-time ticker running.
    async fn execute(
        &self,
        executor: &StageExecutor<'_>,
        stage: Stage,
    ) -> Result<StageOutcome, PipelineError> {
        let ticker = self.ui.clone().map(|ui| {
            ui.start_stage(stage);
            let start = Instant::now();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(1));
                interval.tick().await;
                loop {
                    interval.tick().await;
                    ui.update_elapsed(stage, start.elapsed());
                }
            })
        });

        let outcome = executor.execute(stage).await;
        if let Some(ticker) = ticker {
            ticker.abort();
        }
        outcome
    }
}
