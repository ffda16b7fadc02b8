use uuid::Uuid;

use crate::stage::{Stage, StageReport};

/// A decision resolved during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDecision {
    pub stage: Stage,
    pub summary: String,
    pub choice: String,
}

/// Result of one gate-aware stage execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRun {
    pub report: StageReport,
    pub decision: Option<ResolvedDecision>,
}

/// What a full pipeline run did, in order.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub stages: Vec<StageReport>,
    pub decisions: Vec<ResolvedDecision>,
}

impl RunSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stages: Vec::new(),
            decisions: Vec::new(),
        }
    }

    pub fn record(&mut self, run: StageRun) {
        self.stages.push(run.report);
        if let Some(decision) = run.decision {
            self.decisions.push(decision);
        }
    }

    pub fn completed_stages(&self) -> Vec<Stage> {
        self.stages.iter().map(|report| report.stage).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(stage: Stage) -> StageReport {
        StageReport {
            stage,
            outputs: Vec::new(),
            model: None,
            prompt_fingerprint: None,
        }
    }

    #[test]
    fn test_record_keeps_order_and_decisions() {
        let mut summary = RunSummary::new(Uuid::new_v4());
        summary.record(StageRun {
            report: report(Stage::Bootstrap),
            decision: None,
        });
        summary.record(StageRun {
            report: report(Stage::Design),
            decision: Some(ResolvedDecision {
                stage: Stage::Design,
                summary: "Architecture choice needed".to_string(),
                choice: "monolith".to_string(),
            }),
        });
        assert_eq!(
            summary.completed_stages(),
            [Stage::Bootstrap, Stage::Design]
        );
        assert_eq!(summary.decisions.len(), 1);
    }
}
