//! Artifact store shared between stages.
//!
//! Artifacts are text blobs addressed by `/`-separated names relative to the
//! project's state root (`inputs/REQUIREMENTS.md`, `designs/ARCHITECTURE.md`,
//! `decisions/<slug>.md`, `TRACE.json`). There is no caching: every call goes
//! to the backing store, so the store can be inspected between stages.

use std::collections::BTreeMap;

use crate::errors::StoreError;

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;

/// Directory holding persisted decision documents.
pub const DECISIONS_DIR: &str = "decisions";

/// Maximum length of a decision slug, in characters.
pub const SLUG_MAX_CHARS: usize = 60;

/// Backing store for pipeline artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Read an artifact. Fails with `StoreError::NotFound` if it does not exist.
    fn load(&self, name: &str) -> Result<String, StoreError>;

    /// Write an artifact, creating parents and overwriting unconditionally.
    fn save(&self, name: &str, text: &str) -> Result<(), StoreError>;

    fn exists(&self, name: &str) -> bool;

    /// Delete an artifact. Removing a missing artifact is not an error.
    fn remove(&self, name: &str) -> Result<(), StoreError>;

    /// Pre-create a directory for later artifacts.
    fn ensure_dir(&self, name: &str) -> Result<(), StoreError>;

    /// Names of the artifacts directly under `dir`, sorted.
    fn list(&self, dir: &str) -> Result<Vec<String>, StoreError>;

    /// All persisted decision documents, keyed by slug.
    fn list_decisions(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let mut decisions = BTreeMap::new();
        for name in self.list(DECISIONS_DIR)? {
            let Some(slug) = name
                .strip_prefix(DECISIONS_DIR)
                .and_then(|rest| rest.strip_prefix('/'))
                .and_then(|file| file.strip_suffix(".md"))
            else {
                continue;
            };
            let text = self.load(&name)?;
            decisions.insert(slug.to_string(), text);
        }
        Ok(decisions)
    }

    /// Whether a decision has been recorded for `summary`.
    fn decision_exists(&self, summary: &str) -> bool {
        self.exists(&decision_artifact(summary))
    }

    /// The subset of `names` that do not exist, in the given order.
    fn missing(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter(|name| !self.exists(name))
            .map(|name| name.to_string())
            .collect()
    }
}

/// Normalize a decision summary into its idempotency key.
///
/// Lower-cased, spaces, colons and path separators replaced with `_`, truncated to
/// [`SLUG_MAX_CHARS`] characters.
pub fn slugify(summary: &str) -> String {
    let slug: String = summary
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | ':' | '/' | '\\' => '_',
            other => other,
        })
        .take(SLUG_MAX_CHARS)
        .collect();
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

/// Artifact name of the decision document for `summary`.
pub fn decision_artifact(summary: &str) -> String {
    format!("{}/{}.md", DECISIONS_DIR, slugify(summary))
}

/// Reject names that would escape the state root.
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = |reason| {
        Err(StoreError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };
    if name.trim().is_empty() {
        return invalid("empty name");
    }
    if name.starts_with('/') || name.contains('\\') || name.contains(':') {
        return invalid("must be a relative '/'-separated path");
    }
    if name.split('/').any(|part| part == ".." || part == ".") {
        return invalid("must not contain '.' or '..' components");
    }
    Ok(())
}
