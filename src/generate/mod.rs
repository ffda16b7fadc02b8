//! Generation backends.
//!
//! A [`Generator`] turns a rendered prompt into text. Backends are thin
//! request/response wrappers; failures surface as [`GenerationError`] and are
//! never retried here.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{LlmProvider, PipelineConfig};
use crate::errors::{GenerationError, PipelineError};

mod anthropic;
mod claude_cli;
mod openai;

pub use anthropic::AnthropicGenerator;
pub use claude_cli::ClaudeCliGenerator;
pub use openai::OpenAiGenerator;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[async_trait]
pub trait Generator: Send + Sync {
    /// Identifier recorded in the trace ledger.
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build the generator selected by the configuration.
///
/// An unknown provider or a missing API key is a configuration error.
pub fn build_generator(config: &PipelineConfig) -> Result<Box<dyn Generator>, PipelineError> {
    let provider = config
        .provider()
        .map_err(|e| PipelineError::Configuration(e.to_string()))?;
    tracing::info!(%provider, "building generation backend");

    let generator: Box<dyn Generator> = match provider {
        LlmProvider::Claude => {
            let api_key = api_key_from_env(anthropic::API_KEY_ENV)?;
            Box::new(AnthropicGenerator::new(
                config.llm.claude.model.clone(),
                api_key,
                config.llm.claude.max_tokens,
            )?)
        }
        LlmProvider::OpenAi => {
            let api_key = api_key_from_env(openai::API_KEY_ENV)?;
            Box::new(OpenAiGenerator::new(
                config.llm.openai.model.clone(),
                api_key,
                config.llm.openai.base_url.clone(),
            )?)
        }
        LlmProvider::ClaudeCli => Box::new(ClaudeCliGenerator::new(
            config.llm.claude_cli.command.clone(),
            config.llm.claude_cli.model.clone(),
        )),
    };
    Ok(generator)
}

fn api_key_from_env(var: &str) -> Result<String, PipelineError> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            PipelineError::Configuration(format!(
                "{} is not set. Export it or add it to the project's .env file.",
                var
            ))
        })
}

pub(crate) fn build_http_client() -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| PipelineError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport-level failure onto the generation error taxonomy.
pub(crate) fn map_http_error(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Request(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        GenerationError::Request(format!("Connection error: {}", error))
    } else if error.is_decode() {
        GenerationError::BadResponse(format!("Failed to decode response: {}", error))
    } else {
        GenerationError::Request(error.to_string())
    }
}

/// Map a non-success HTTP status and its body onto the error taxonomy.
pub(crate) fn map_status_error(status: u16, body: String) -> GenerationError {
    match status {
        401 | 403 => GenerationError::Auth(body),
        429 => GenerationError::RateLimit(body),
        _ => GenerationError::Request(format!("status {}: {}", status, body)),
    }
}
