use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{ArtifactStore, validate_name};
use crate::errors::StoreError;

/// In-memory artifact store with the same contract as the filesystem one.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<BTreeMap<String, String>>,
    dirs: Mutex<BTreeSet<String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with artifacts, e.g. the intake outputs.
    pub fn with_artifacts<'a>(artifacts: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.artifacts.lock().unwrap_or_else(|e| e.into_inner());
            for (name, text) in artifacts {
                map.insert(name.to_string(), text.to_string());
            }
        }
        store
    }

    /// Whether `ensure_dir` was called for `name`.
    pub fn has_dir(&self, name: &str) -> bool {
        self.dirs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(name)
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load(&self, name: &str) -> Result<String, StoreError> {
        validate_name(name)?;
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            })
    }

    fn save(&self, name: &str, text: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), text.to_string());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
        Ok(())
    }

    fn ensure_dir(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        self.dirs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.trim_end_matches('/').to_string());
        Ok(())
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        validate_name(dir)?;
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|name| {
                name.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let store = MemoryArtifactStore::new();
        store.save("designs/ARCHITECTURE.md", "layers").unwrap();
        assert_eq!(store.load("designs/ARCHITECTURE.md").unwrap(), "layers");
    }

    #[test]
    fn test_missing_is_not_found() {
        let store = MemoryArtifactStore::new();
        assert!(store.load("TRACE.json").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_is_one_level_deep() {
        let store = MemoryArtifactStore::with_artifacts([
            ("decisions/a.md", "a"),
            ("decisions/pending/a.json", "{}"),
            ("designs/ARCHITECTURE.md", "x"),
        ]);
        assert_eq!(store.list("decisions").unwrap(), vec!["decisions/a.md"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = MemoryArtifactStore::with_artifacts([("decisions/pending/a.choice", "x")]);
        store.remove("decisions/pending/a.choice").unwrap();
        assert!(!store.exists("decisions/pending/a.choice"));
        store.remove("decisions/pending/a.choice").unwrap();
    }

    #[test]
    fn test_ensure_dir_is_recorded() {
        let store = MemoryArtifactStore::new();
        store.ensure_dir("designs").unwrap();
        assert!(store.has_dir("designs"));
        assert!(!store.exists("designs"));
    }

    #[test]
    fn test_list_decisions_matches_fs_contract() {
        let store = MemoryArtifactStore::with_artifacts([(
            "decisions/architecture_choice_needed.md",
            "Choice: monolith\n",
        )]);
        assert!(store.decision_exists("Architecture choice needed"));
        let decisions = store.list_decisions().unwrap();
        assert!(decisions.contains_key("architecture_choice_needed"));
    }
}
