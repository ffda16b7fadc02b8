//! Pipeline configuration read from `stagegate.toml`.
//!
//! The file is located through [`ProjectContext::config_path`]: a
//! project-local file wins, otherwise the engine default is used, and a
//! missing file means built-in defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [llm]
//! provider = "claude"          # claude | openai | claude-cli
//!
//! [llm.claude]
//! model = "claude-sonnet-4-20250514"
//! max_tokens = 4096
//!
//! [llm.openai]
//! model = "gpt-4o"
//!
//! [llm.claude_cli]
//! command = "claude"
//!
//! [notifications]
//! enabled = false
//! method = "slack"             # slack | email
//! slack_webhook_url = ""
//! email_to = ""
//!
//! [gates]
//! source = "prompt"            # prompt | file
//! poll_interval_secs = 5
//! ```
//!
//! Layering: file → environment (`STAGEGATE_LLM_PROVIDER`) → CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::context::ProjectContext;

/// Environment variable overriding `llm.provider`.
pub const PROVIDER_ENV: &str = "STAGEGATE_LLM_PROVIDER";

/// Generation backends known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Claude,
    OpenAi,
    ClaudeCli,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Claude => write!(f, "claude"),
            LlmProvider::OpenAi => write!(f, "openai"),
            LlmProvider::ClaudeCli => write!(f, "claude-cli"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(LlmProvider::Claude),
            "openai" => Ok(LlmProvider::OpenAi),
            "claude-cli" | "claude_cli" => Ok(LlmProvider::ClaudeCli),
            _ => anyhow::bail!(
                "Unknown LLM provider '{}'. Valid values: claude, openai, claude-cli",
                s
            ),
        }
    }
}

/// Where a pending decision gets its answer from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionSourceKind {
    /// Interactive terminal prompt
    #[default]
    Prompt,
    /// Wait for `stagegate decide` to drop a choice file
    File,
}

impl std::fmt::Display for DecisionSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionSourceKind::Prompt => write!(f, "prompt"),
            DecisionSourceKind::File => write!(f, "file"),
        }
    }
}

impl std::str::FromStr for DecisionSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prompt" => Ok(DecisionSourceKind::Prompt),
            "file" => Ok(DecisionSourceKind::File),
            _ => anyhow::bail!(
                "Invalid decision source '{}'. Valid values: prompt, file",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeSection {
    #[serde(default = "default_claude_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_claude_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for ClaudeSection {
    fn default() -> Self {
        Self {
            model: default_claude_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSection {
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Custom endpoint, e.g. an OpenAI-compatible local server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeCliSection {
    #[serde(default = "default_claude_cmd")]
    pub command: String,
    /// Model reported in the ledger; the CLI picks its own when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_claude_cmd() -> String {
    "claude".to_string()
}

impl Default for ClaudeCliSection {
    fn default() -> Self {
        Self {
            command: default_claude_cmd(),
            model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    /// Kept as text so an unknown backend surfaces when the generator is built
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub claude: ClaudeSection,
    #[serde(default)]
    pub openai: OpenAiSection,
    #[serde(default)]
    pub claude_cli: ClaudeCliSection,
}

fn default_provider() -> String {
    "claude".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            claude: ClaudeSection::default(),
            openai: OpenAiSection::default(),
            claude_cli: ClaudeCliSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_notification_method")]
    pub method: String,
    #[serde(default)]
    pub slack_webhook_url: String,
    #[serde(default)]
    pub email_to: String,
}

fn default_notification_method() -> String {
    "slack".to_string()
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            method: default_notification_method(),
            slack_webhook_url: String::new(),
            email_to: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatesSection {
    /// Kept as text so an unknown source is a warning, not a parse error
    #[serde(default = "default_decision_source")]
    pub source: String,
    /// How often the file source checks for a choice
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_decision_source() -> String {
    DecisionSourceKind::default().to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for GatesSection {
    fn default() -> Self {
        Self {
            source: default_decision_source(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// The complete `stagegate.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub notifications: NotificationsSection,
    #[serde(default)]
    pub gates: GatesSection,
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse stagegate.toml")
    }

    /// Load from `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load the configuration the context points at.
    pub fn for_context(ctx: &ProjectContext) -> Result<Self> {
        Self::load_or_default(&ctx.config_path())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize stagegate.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Provider name, with the environment overriding the file.
    pub fn provider_name(&self) -> String {
        std::env::var(PROVIDER_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.llm.provider.clone())
    }

    /// Parsed provider; fails for an unknown backend.
    pub fn provider(&self) -> Result<LlmProvider> {
        self.provider_name().parse()
    }

    /// Parsed decision source; fails for an unknown value.
    pub fn decision_source(&self) -> Result<DecisionSourceKind> {
        self.gates.source.parse()
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = self.llm.provider.parse::<LlmProvider>() {
            warnings.push(e.to_string());
        }

        if self.llm.claude.max_tokens == 0 {
            warnings.push("llm.claude.max_tokens must be greater than 0".to_string());
        }

        if self.notifications.enabled {
            match self.notifications.method.as_str() {
                "slack" if self.notifications.slack_webhook_url.is_empty() => warnings.push(
                    "notifications.method is 'slack' but slack_webhook_url is empty".to_string(),
                ),
                "email" if self.notifications.email_to.is_empty() => warnings.push(
                    "notifications.method is 'email' but email_to is empty".to_string(),
                ),
                "slack" | "email" => {}
                other => warnings.push(format!(
                    "Unknown notification method '{}': notifications will only be logged",
                    other
                )),
            }
        }

        if self.decision_source().is_err() {
            warnings.push(format!(
                "Unknown decision source '{}': expected prompt or file",
                self.gates.source
            ));
        }

        if self.gates.poll_interval_secs == 0 {
            warnings.push("gates.poll_interval_secs must be greater than 0".to_string());
        }

        warnings
    }
}
