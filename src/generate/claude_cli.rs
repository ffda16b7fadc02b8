use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::Generator;
use crate::errors::GenerationError;

/// Model label used when the CLI picks its own model.
const CLI_DEFAULT_MODEL: &str = "claude-cli";

/// Pipes the prompt to `claude --print` and returns its stdout.
pub struct ClaudeCliGenerator {
    command: String,
    model: String,
}

impl ClaudeCliGenerator {
    pub fn new(command: String, model: Option<String>) -> Self {
        Self {
            command,
            model: model.unwrap_or_else(|| CLI_DEFAULT_MODEL.to_string()),
        }
    }

    fn flags(&self) -> Vec<String> {
        let mut flags = vec!["--print".to_string()];
        if self.model != CLI_DEFAULT_MODEL {
            flags.push("--model".to_string());
            flags.push(self.model.clone());
        }
        flags
    }
}

#[async_trait]
impl Generator for ClaudeCliGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let flags = self.flags();
        tracing::debug!(command = %self.command, flags = ?flags, "spawning generation process");

        let mut child = Command::new(&self.command)
            .args(&flags)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                GenerationError::Process(format!("Failed to spawn {}: {}", self.command, e))
            })?;

        // Feed stdin from a task so a chatty child cannot fill its stdout pipe first
        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = prompt.to_string();
            tokio::spawn(async move {
                stdin.write_all(prompt.as_bytes()).await?;
                stdin.shutdown().await
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GenerationError::Process(format!("Failed to wait for process: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenerationError::Process(format!(
                "{} exited with {}: {}",
                self.command,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        if let Some(writer) = writer {
            writer
                .await
                .map_err(|e| GenerationError::Process(format!("Prompt writer panicked: {}", e)))?
                .map_err(|e| GenerationError::Process(format!("Failed to write prompt: {}", e)))?;
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(GenerationError::BadResponse(format!(
                "{} produced no output",
                self.command
            )));
        }
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_include_model_when_set() {
        let generator = ClaudeCliGenerator::new("claude".into(), Some("opus".into()));
        assert_eq!(generator.flags(), vec!["--print", "--model", "opus"]);
    }

    #[test]
    fn test_flags_without_model() {
        let generator = ClaudeCliGenerator::new("claude".into(), None);
        assert_eq!(generator.flags(), vec!["--print"]);
        assert_eq!(generator.model(), "claude-cli");
    }

    #[tokio::test]
    async fn test_missing_command_is_process_error() {
        let generator =
            ClaudeCliGenerator::new("definitely-not-a-real-binary-7f3a".into(), None);
        let err = generator.generate("hello").await.unwrap_err();
        assert!(matches!(err, GenerationError::Process(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prompt_is_piped_through_stdin() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-claude");
        std::fs::write(&script, "#!/bin/sh\ncat\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let generator = ClaudeCliGenerator::new(script.to_string_lossy().into_owned(), None);
        let output = generator.generate("echo this back").await.unwrap();
        assert_eq!(output, "echo this back");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_process_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("failing-claude");
        std::fs::write(&script, "#!/bin/sh\ncat >/dev/null\necho 'quota exceeded' >&2\nexit 3\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let generator = ClaudeCliGenerator::new(script.to_string_lossy().into_owned(), None);
        match generator.generate("x").await.unwrap_err() {
            GenerationError::Process(msg) => {
                assert!(msg.contains("3"));
                assert!(msg.contains("quota exceeded"));
            }
            other => panic!("Expected Process, got {:?}", other),
        }
    }
}
