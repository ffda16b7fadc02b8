use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};

use super::DecisionRequest;
use crate::store::{ArtifactStore, DECISIONS_DIR, slugify};

const PENDING_DIR: &str = "pending";

/// Where human choices come from.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn choose(&self, request: &DecisionRequest) -> Result<String>;
}

/// Resolve free-form input against the offered options.
///
/// Accepts an exact option, a case-insensitive match, or a 1-based index.
/// With no options any non-empty answer is accepted.
pub fn match_option(options: &[String], input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if options.is_empty() {
        return Some(input.to_string());
    }
    if let Some(exact) = options.iter().find(|o| o.as_str() == input) {
        return Some(exact.clone());
    }
    if let Some(folded) = options.iter().find(|o| o.eq_ignore_ascii_case(input)) {
        return Some(folded.clone());
    }
    input
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=options.len()).contains(n))
        .map(|n| options[n - 1].clone())
}

/// Interactive terminal prompt.
#[derive(Debug, Default)]
pub struct PromptDecisionSource;

impl PromptDecisionSource {
    pub fn new() -> Self {
        Self
    }

    fn prompt(request: &DecisionRequest) -> Result<String> {
        eprintln!();
        eprintln!(
            "{} {}",
            style("Decision required:").yellow().bold(),
            style(&request.summary).bold()
        );
        eprintln!("  {} {}", style("stage").dim(), request.stage);

        let theme = ColorfulTheme::default();
        if request.options.is_empty() {
            let answer: String = Input::with_theme(&theme)
                .with_prompt("Your choice")
                .interact_text()?;
            return Ok(answer.trim().to_string());
        }

        let selection = Select::with_theme(&theme)
            .with_prompt("Choose an approach")
            .items(&request.options)
            .default(0)
            .interact()?;
        Ok(request.options[selection].clone())
    }
}

#[async_trait]
impl DecisionSource for PromptDecisionSource {
    async fn choose(&self, request: &DecisionRequest) -> Result<String> {
        let request = request.clone();
        on_detached_thread(move || Self::prompt(&request)).await
    }
}

/// Run a blocking prompt on its own thread and await the answer.
///
/// The thread is abandoned when the caller stops waiting, so a timed-out
/// prompt never holds up runtime shutdown.
async fn on_detached_thread<F>(prompt: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    std::thread::Builder::new()
        .name("decision-prompt".to_string())
        .spawn(move || {
            let _ = tx.send(prompt());
        })
        .context("Failed to start the decision prompt")?;
    rx.await.context("Decision prompt exited without an answer")?
}

fn pending_request_name(slug: &str) -> String {
    format!("{}/{}/{}.json", DECISIONS_DIR, PENDING_DIR, slug)
}

fn pending_choice_name(slug: &str) -> String {
    format!("{}/{}/{}.choice", DECISIONS_DIR, PENDING_DIR, slug)
}

/// File-drop source for unattended runs.
///
/// Publishes `decisions/pending/<slug>.json` and polls for a sibling
/// `<slug>.choice`, which `stagegate decide` writes.
pub struct FileDecisionSource {
    store: Arc<dyn ArtifactStore>,
    poll_interval: Duration,
}

impl FileDecisionSource {
    pub fn new(store: Arc<dyn ArtifactStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }
}

#[async_trait]
impl DecisionSource for FileDecisionSource {
    async fn choose(&self, request: &DecisionRequest) -> Result<String> {
        let slug = slugify(&request.summary);
        let request_name = pending_request_name(&slug);
        let choice_name = pending_choice_name(&slug);

        let payload = serde_json::to_string_pretty(request)?;
        self.store.save(&request_name, &payload)?;
        eprintln!(
            "{} {} (answer with `stagegate decide <choice>`)",
            style("Waiting for decision:").yellow().bold(),
            request.summary
        );
        tracing::info!(pending = %request_name, "waiting for decision file");

        let mut last_rejected: Option<String> = None;
        loop {
            if self.store.exists(&choice_name) {
                let raw = self.store.load(&choice_name)?;
                let raw = raw.trim();
                match match_option(&request.options, raw) {
                    Some(choice) => {
                        self.store.remove(&choice_name)?;
                        self.store.remove(&request_name)?;
                        return Ok(choice);
                    }
                    None if last_rejected.as_deref() != Some(raw) => {
                        tracing::warn!(
                            choice = raw,
                            options = ?request.options,
                            "ignoring choice that is not one of the options"
                        );
                        last_rejected = Some(raw.to_string());
                    }
                    None => {}
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Requests currently waiting in `decisions/pending/`.
pub fn pending_requests(store: &dyn ArtifactStore) -> Result<Vec<DecisionRequest>> {
    let dir = format!("{}/{}", DECISIONS_DIR, PENDING_DIR);
    let mut requests = Vec::new();
    for name in store.list(&dir)? {
        if !name.ends_with(".json") {
            continue;
        }
        let text = store.load(&name)?;
        let request: DecisionRequest =
            serde_json::from_str(&text).with_context(|| format!("Invalid pending request {}", name))?;
        requests.push(request);
    }
    Ok(requests)
}

/// Answer a pending request by writing its `.choice` file.
///
/// Without a summary there must be exactly one pending request. Returns the
/// request that was answered and the normalized choice.
pub fn answer_pending(
    store: &dyn ArtifactStore,
    summary: Option<&str>,
    choice: &str,
) -> Result<(DecisionRequest, String)> {
    let pending = pending_requests(store)?;
    let request = match summary {
        Some(summary) => {
            let slug = slugify(summary);
            pending
                .into_iter()
                .find(|r| slugify(&r.summary) == slug)
                .with_context(|| format!("No pending decision matches '{}'", summary))?
        }
        None => match pending.len() {
            0 => bail!("No pending decisions"),
            1 => pending.into_iter().next().context("No pending decisions")?,
            n => bail!(
                "{} decisions are pending; pass --summary to pick one",
                n
            ),
        },
    };

    let Some(normalized) = match_option(&request.options, choice) else {
        bail!(
            "'{}' is not one of the options: {}",
            choice,
            request.options.join(", ")
        );
    };
    store.save(&pending_choice_name(&slugify(&request.summary)), &normalized)?;
    Ok((request, normalized))
}

/// Preset answers, consumed in order. Once exhausted it never answers.
#[derive(Debug, Default)]
pub struct ScriptedDecisionSource {
    choices: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<DecisionRequest>>,
}

impl ScriptedDecisionSource {
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: Mutex::new(choices.into_iter().map(Into::into).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every request this source was asked to answer.
    pub fn requests(&self) -> Vec<DecisionRequest> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl DecisionSource for ScriptedDecisionSource {
    async fn choose(&self, request: &DecisionRequest) -> Result<String> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        let next = self
            .choices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(choice) => Ok(choice),
            None => std::future::pending().await,
        }
    }
}
