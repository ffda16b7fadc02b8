//! Persisted decision documents.
//!
//! ```text
//! # Decision: <summary>
//!
//! Choice: <choice>
//! ```

use crate::errors::StoreError;
use crate::store::{ArtifactStore, decision_artifact};

const HEADING_PREFIX: &str = "# Decision:";
const CHOICE_PREFIX: &str = "Choice:";

pub fn render_decision(summary: &str, choice: &str) -> String {
    format!("{} {}\n\n{} {}\n", HEADING_PREFIX, summary, CHOICE_PREFIX, choice)
}

/// Write `decisions/<slug>.md` and return the artifact name.
pub fn persist_decision(
    store: &dyn ArtifactStore,
    summary: &str,
    choice: &str,
) -> Result<String, StoreError> {
    let name = decision_artifact(summary);
    store.save(&name, &render_decision(summary, choice))?;
    tracing::info!(artifact = %name, choice, "decision recorded");
    Ok(name)
}

/// The recorded choice: the text after the first `Choice:` line.
pub fn parse_choice(document: &str) -> Option<String> {
    document
        .lines()
        .find_map(|line| line.trim_start().strip_prefix(CHOICE_PREFIX))
        .map(|choice| choice.trim().to_string())
        .filter(|choice| !choice.is_empty())
}

/// The summary from the `# Decision:` heading.
pub fn parse_summary(document: &str) -> Option<String> {
    document
        .lines()
        .find_map(|line| line.strip_prefix(HEADING_PREFIX))
        .map(|summary| summary.trim().to_string())
}

/// Load the recorded choice for `summary`, if any.
///
/// A document without a usable `Choice:` line is [`StoreError::Corrupt`].
pub fn recorded_choice(
    store: &dyn ArtifactStore,
    summary: &str,
) -> Result<Option<String>, StoreError> {
    let name = decision_artifact(summary);
    match store.load(&name) {
        Ok(document) => match parse_choice(&document) {
            Some(choice) => Ok(Some(choice)),
            None => Err(StoreError::Corrupt {
                name,
                message: format!("missing or empty '{}' line", CHOICE_PREFIX),
            }),
        },
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
