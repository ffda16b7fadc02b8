//! Pipeline execution - `stagegate run` and `stagegate stage <name>`.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use stagegate::config::{DecisionSourceKind, PipelineConfig};
use stagegate::context::ProjectContext;
use stagegate::errors::PipelineError;
use stagegate::gates::{DecisionSource, FileDecisionSource, PromptDecisionSource};
use stagegate::generate::{Generator, build_generator};
use stagegate::notify::Notifier;
use stagegate::orchestrator::Pipeline;
use stagegate::stage::{self, REQUIRED_INPUTS, Stage};
use stagegate::store::{ArtifactStore, FsArtifactStore};
use stagegate::templates::PromptLibrary;
use stagegate::ui::PipelineUI;

/// Refuse to start until intake has produced every required input.
pub fn check_intake(ctx: &ProjectContext, store: &dyn ArtifactStore) -> Result<()> {
    let missing = store.missing(&REQUIRED_INPUTS);
    if missing.is_empty() {
        return Ok(());
    }

    eprintln!();
    eprintln!(
        "{}",
        console::style("Intake has not been completed.").red().bold()
    );
    eprintln!("Missing inputs:");
    for name in &missing {
        eprintln!("  - {}", ctx.state_dir().join(name).display());
    }
    eprintln!();
    eprintln!("Run intake first to populate the state inputs, then re-run.");
    eprintln!();
    Err(PipelineError::IntakeIncomplete { missing }.into())
}

fn decision_source(
    kind: DecisionSourceKind,
    config: &PipelineConfig,
    store: Arc<dyn ArtifactStore>,
) -> Arc<dyn DecisionSource> {
    match kind {
        DecisionSourceKind::Prompt => Arc::new(PromptDecisionSource::new()),
        DecisionSourceKind::File => Arc::new(FileDecisionSource::new(
            store,
            Duration::from_secs(config.gates.poll_interval_secs.max(1)),
        )),
    }
}

fn build_pipeline(
    ctx: &ProjectContext,
    store: Arc<dyn ArtifactStore>,
    decisions_override: Option<&str>,
    total_stages: u64,
    verbose: bool,
) -> Result<Pipeline> {
    let config = PipelineConfig::for_context(ctx)?;
    for warning in config.validate() {
        tracing::warn!("config: {}", warning);
    }

    let kind = match decisions_override {
        Some(kind) => kind.parse()?,
        None => config.decision_source()?,
    };

    let generator: Arc<dyn Generator> = Arc::from(build_generator(&config)?);
    let ui = Arc::new(PipelineUI::new(total_stages, verbose));
    ui.print_header(&ctx.project_dir().display().to_string(), generator.model());

    Ok(Pipeline::new(
        store.clone(),
        generator,
        decision_source(kind, &config, store),
    )
    .with_prompts(PromptLibrary::for_context(ctx))
    .with_notifier(Notifier::new(&config.notifications))
    .with_ui(ui))
}

pub async fn run_pipeline(
    ctx: &ProjectContext,
    decisions: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(ctx.state_dir()));
    check_intake(ctx, store.as_ref())?;

    let pipeline = build_pipeline(
        ctx,
        store,
        decisions,
        Stage::ALL.len() as u64,
        verbose,
    )?;
    let summary = pipeline.run_all().await?;

    println!("Run {}", summary.run_id);
    for report in &summary.stages {
        println!("  {:<10} {}", report.stage.name(), report.outputs.join(", "));
    }
    for decision in &summary.decisions {
        println!(
            "  decision  {} -> {}",
            decision.summary,
            console::style(&decision.choice).green()
        );
    }
    Ok(())
}

pub async fn run_single_stage(
    ctx: &ProjectContext,
    name: &str,
    decisions: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let stage: Stage = name.parse()?;
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(ctx.state_dir()));

    if stage == Stage::Bootstrap {
        check_intake(ctx, store.as_ref())?;
        stage::bootstrap(store.as_ref())?;
        println!("Bootstrap complete: ledger reset, output directories created.");
        return Ok(());
    }

    let pipeline = build_pipeline(ctx, store, decisions, 1, verbose)?;
    let run = pipeline.run_stage(stage).await?;
    println!("{} -> {}", stage, run.report.outputs.join(", "));
    if let Some(decision) = run.decision {
        println!("  decision  {} -> {}", decision.summary, decision.choice);
    }
    Ok(())
}
