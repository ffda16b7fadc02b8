//! Typed error hierarchy for the stagegate pipeline.
//!
//! Three enums cover the three subsystems:
//! - `StoreError` - artifact store and ledger persistence failures
//! - `GenerationError` - failures reported by a generation backend
//! - `PipelineError` - everything that halts a run
//!
//! A stage asking for a human decision is *not* an error; it is the
//! `StageOutcome::NeedsDecision` variant handled by the driver.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors from the artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact not found: {name}")]
    NotFound { name: String },

    #[error("Invalid artifact name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("I/O error on artifact {name} ({path}): {source}")]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact {name} is corrupt: {message}")]
    Corrupt { name: String, message: String },
}

impl StoreError {
    /// True when the error means "the artifact does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Errors from a generation backend. Propagated unmodified, never retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation backend rejected credentials: {0}")]
    Auth(String),

    #[error("Generation backend rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Generation backend returned an unusable response: {0}")]
    BadResponse(String),

    #[error("Generation process failed: {0}")]
    Process(String),
}

/// Errors that halt a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing artifact(s): {}", names.join(", "))]
    MissingArtifact { names: Vec<String> },

    #[error(
        "Intake has not been completed. Run intake first to populate the state inputs.\nMissing: {}",
        missing.join(", ")
    )]
    IntakeIncomplete { missing: Vec<String> },

    #[error("Timed out after {}s waiting for decision: {summary}", waited.as_secs())]
    DecisionTimeout { summary: String, waited: Duration },

    #[error("Stage {stage} requested decision '{summary}' again after it was resolved")]
    UnresolvedDecision { stage: String, summary: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Template for stage {stage} references unknown placeholder {{{placeholder}}}")]
    Template { stage: String, placeholder: String },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_not_found_is_matchable() {
        let err = StoreError::NotFound {
            name: "designs/ARCHITECTURE.md".to_string(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("designs/ARCHITECTURE.md"));
    }

    #[test]
    fn store_error_io_carries_kind() {
        let err = StoreError::Io {
            name: "TRACE.json".to_string(),
            path: PathBuf::from("/state/TRACE.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        match &err {
            StoreError::Io { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied)
            }
            _ => panic!("Expected Io"),
        }
        assert!(!err.is_not_found());
    }

    #[test]
    fn missing_artifact_lists_all_names() {
        let err = PipelineError::MissingArtifact {
            names: vec![
                "inputs/REQUIREMENTS.md".to_string(),
                "inputs/NON_GOALS.md".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("inputs/REQUIREMENTS.md"));
        assert!(msg.contains("inputs/NON_GOALS.md"));
    }

    #[test]
    fn intake_incomplete_is_actionable() {
        let err = PipelineError::IntakeIncomplete {
            missing: vec!["inputs/CONSTRAINTS.md".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Run intake first"));
        assert!(msg.contains("inputs/CONSTRAINTS.md"));
    }

    #[test]
    fn template_error_shows_braced_placeholder() {
        let err = PipelineError::Template {
            stage: "design".to_string(),
            placeholder: "nope".to_string(),
        };
        assert!(err.to_string().contains("{nope}"));
    }

    #[test]
    fn pipeline_error_converts_from_store_and_generation() {
        let store: PipelineError = StoreError::NotFound {
            name: "x".to_string(),
        }
        .into();
        assert!(matches!(store, PipelineError::Store(StoreError::NotFound { .. })));

        let generation: PipelineError = GenerationError::RateLimit("slow down".to_string()).into();
        assert!(matches!(
            generation,
            PipelineError::Generation(GenerationError::RateLimit(_))
        ));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&StoreError::NotFound { name: "a".into() });
        assert_std_error(&GenerationError::Auth("bad key".into()));
        assert_std_error(&PipelineError::Configuration("x".into()));
    }
}
