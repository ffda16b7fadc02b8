//! Execution ledger: one record per stage invocation.
//!
//! The ledger lives in `TRACE.json` as a pretty-printed JSON array. It is
//! append-only within a run; `bootstrap` truncates it to `[]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod ledger;
pub use ledger::{TRACE_FILE, TraceLedger};

/// Number of hex characters kept from a prompt digest.
pub const FINGERPRINT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub task: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// Generation backend identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_fingerprint: Option<String>,
}

impl TraceEntry {
    pub fn new(task: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            task: task.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc::now(),
            model: None,
            prompt_fingerprint: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.prompt_fingerprint = Some(fingerprint.into());
        self
    }
}

/// Short deterministic digest of prompt text.
///
/// SHA-256 of the UTF-8 bytes, first [`FINGERPRINT_LEN`] lowercase hex characters.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..FINGERPRINT_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_sixteen_hex_chars() {
        for text in ["", "a", "design prompt", &"x".repeat(10_000)] {
            let fp = fingerprint(text);
            assert_eq!(fp.len(), FINGERPRINT_LEN);
            assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint("same prompt"), fingerprint("same prompt"));
        assert_ne!(fingerprint("prompt a"), fingerprint("prompt b"));
    }

    #[test]
    fn test_fingerprint_known_value() {
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb924...
        assert_eq!(fingerprint(""), "e3b0c44298fc1c14");
    }

    #[test]
    fn test_entry_omits_absent_optionals() {
        let entry = TraceEntry::new("bootstrap", &[], &[]);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("model").is_none());
        assert!(json.get("prompt_fingerprint").is_none());
        assert!(json.get("timestamp").unwrap().is_string());
    }

    #[test]
    fn test_entry_builder_sets_optionals() {
        let entry = TraceEntry::new("design", &["inputs/REQUIREMENTS.md"], &["designs/ARCHITECTURE.md"])
            .with_model("gpt-4o")
            .with_fingerprint("0123456789abcdef");
        assert_eq!(entry.model.as_deref(), Some("gpt-4o"));
        assert_eq!(entry.prompt_fingerprint.as_deref(), Some("0123456789abcdef"));
        assert_eq!(entry.inputs, vec!["inputs/REQUIREMENTS.md"]);
    }
}
