use super::TraceEntry;
use crate::errors::StoreError;
use crate::store::ArtifactStore;

/// Artifact name of the ledger.
pub const TRACE_FILE: &str = "TRACE.json";

/// Append-only view over `TRACE.json` in an artifact store.
///
/// Entries are never removed or edited; `reset` is the only truncation.
pub struct TraceLedger<'a> {
    store: &'a dyn ArtifactStore,
}

impl<'a> TraceLedger<'a> {
    pub fn new(store: &'a dyn ArtifactStore) -> Self {
        Self { store }
    }

    /// Current entries, oldest first. Absent or blank ledger means no entries.
    pub fn entries(&self) -> Result<Vec<TraceEntry>, StoreError> {
        let text = match self.store.load(TRACE_FILE) {
            Ok(text) => text,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            name: TRACE_FILE.to_string(),
            message: e.to_string(),
        })
    }

    /// Append one entry and rewrite the whole sequence.
    pub fn append(&self, entry: TraceEntry) -> Result<(), StoreError> {
        let mut entries = self.entries()?;
        tracing::debug!(task = %entry.task, position = entries.len(), "appending trace entry");
        entries.push(entry);
        self.write(&entries)
    }

    /// Truncate the ledger to the empty sequence.
    pub fn reset(&self) -> Result<(), StoreError> {
        self.write(&[])
    }

    fn write(&self, entries: &[TraceEntry]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| StoreError::Corrupt {
            name: TRACE_FILE.to_string(),
            message: format!("failed to serialize ledger: {}", e),
        })?;
        self.store.save(TRACE_FILE, &format!("{}\n", json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FsArtifactStore, MemoryArtifactStore};
    use tempfile::TempDir;

    #[test]
    fn test_absent_ledger_is_empty() {
        let store = MemoryArtifactStore::new();
        assert!(TraceLedger::new(&store).entries().unwrap().is_empty());
    }

    #[test]
    fn test_blank_ledger_is_empty() {
        let store = MemoryArtifactStore::with_artifacts([(TRACE_FILE, "  \n")]);
        assert!(TraceLedger::new(&store).entries().unwrap().is_empty());
    }

    #[test]
    fn test_reset_writes_empty_array() {
        let store = MemoryArtifactStore::new();
        let ledger = TraceLedger::new(&store);
        ledger.append(TraceEntry::new("design", &[], &[])).unwrap();
        ledger.reset().unwrap();
        assert!(ledger.entries().unwrap().is_empty());
        assert_eq!(store.load(TRACE_FILE).unwrap(), "[]\n");
    }

    #[test]
    fn test_append_preserves_order() {
        let store = MemoryArtifactStore::new();
        let ledger = TraceLedger::new(&store);
        for task in ["design", "implement", "test", "verify"] {
            ledger.append(TraceEntry::new(task, &[], &[])).unwrap();
        }
        let tasks: Vec<String> = ledger
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.task)
            .collect();
        assert_eq!(tasks, vec!["design", "implement", "test", "verify"]);
    }

    #[test]
    fn test_corrupt_ledger_is_reported() {
        let store = MemoryArtifactStore::with_artifacts([(TRACE_FILE, "{not json")]);
        let err = TraceLedger::new(&store).entries().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_ledger_file_is_pretty_json_array() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let ledger = TraceLedger::new(&store);
        ledger
            .append(
                TraceEntry::new(
                    "implement",
                    &["designs/ARCHITECTURE.md"],
                    &["implementations/IMPLEMENTATION.md"],
                )
                .with_model("claude-sonnet-4-20250514")
                .with_fingerprint("0123456789abcdef"),
            )
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join(TRACE_FILE)).unwrap();
        assert!(content.ends_with("\n"));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let entries = value.as_array().expect("ledger must be a JSON array");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["task"], "implement");
        assert_eq!(entries[0]["outputs"][0], "implementations/IMPLEMENTATION.md");
        assert_eq!(entries[0]["prompt_fingerprint"], "0123456789abcdef");

        // Timestamps are RFC 3339 / ISO-8601 UTC
        let ts = entries[0]["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_second_ledger_sees_first_ledgers_entries() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        TraceLedger::new(&store)
            .append(TraceEntry::new("design", &[], &[]))
            .unwrap();
        let reopened = FsArtifactStore::new(dir.path());
        assert_eq!(TraceLedger::new(&reopened).entries().unwrap().len(), 1);
    }
}
