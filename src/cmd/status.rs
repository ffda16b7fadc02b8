//! Read-only views of a project's state - `status`, `trace`, `decisions`.

use anyhow::{Context, Result};
use console::style;

use stagegate::context::ProjectContext;
use stagegate::gates::{parse_choice, parse_summary, pending_requests};
use stagegate::stage::{REQUIRED_INPUTS, Stage};
use stagegate::store::{ArtifactStore, FsArtifactStore};
use stagegate::trace::TraceLedger;

/// `project.name` from `inputs/project_spec.yml`, if readable.
fn project_name(store: &dyn ArtifactStore) -> Option<String> {
    let text = store.load("inputs/project_spec.yml").ok()?;
    let spec: serde_yaml::Value = serde_yaml::from_str(&text).ok()?;
    spec.get("project")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn presence(exists: bool) -> console::StyledObject<&'static str> {
    if exists {
        style("present").green()
    } else {
        style("missing").red()
    }
}

pub fn cmd_status(ctx: &ProjectContext) -> Result<()> {
    let store = FsArtifactStore::new(ctx.state_dir());

    println!();
    println!("Project:   {}", ctx.project_dir().display());
    if let Some(name) = project_name(&store) {
        println!("Name:      {}", style(name).bold());
    }
    println!("State:     {}", ctx.state_dir().display());
    println!("Config:    {}", ctx.config_path().display());
    println!("Prompts:   {}", ctx.prompts_dir().display());
    println!();

    println!("{}", style("Inputs").underlined());
    for name in REQUIRED_INPUTS {
        println!("  {:<36} {}", name, presence(store.exists(name)));
    }
    println!();

    println!("{}", style("Stages").underlined());
    for stage in Stage::ALL {
        if let Some(output) = stage.spec().output {
            println!(
                "  {:<10} {:<36} {}",
                stage.name(),
                output,
                presence(store.exists(output))
            );
        }
    }
    println!();

    let decisions = store.list_decisions()?;
    let pending = pending_requests(&store)?;
    let entries = TraceLedger::new(&store).entries()?;
    println!("Decisions: {} recorded, {} pending", decisions.len(), pending.len());
    for request in &pending {
        println!(
            "  {} {} [{}]",
            style("pending").yellow(),
            request.summary,
            request.options.join(" | ")
        );
    }
    println!("Ledger:    {} entries", entries.len());
    println!();
    Ok(())
}

pub fn cmd_trace(ctx: &ProjectContext) -> Result<()> {
    let store = FsArtifactStore::new(ctx.state_dir());
    let entries = TraceLedger::new(&store)
        .entries()
        .context("Failed to read the execution ledger")?;

    if entries.is_empty() {
        println!("No trace entries.");
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            i + 1,
            style(&entry.task).cyan().bold(),
            style(entry.timestamp.to_rfc3339()).dim()
        );
        println!("     in:  {}", entry.inputs.join(", "));
        println!("     out: {}", entry.outputs.join(", "));
        if let Some(model) = &entry.model {
            println!("     model: {}", model);
        }
        if let Some(fp) = &entry.prompt_fingerprint {
            println!("     prompt: {}", fp);
        }
    }
    Ok(())
}

pub fn cmd_decisions(ctx: &ProjectContext) -> Result<()> {
    let store = FsArtifactStore::new(ctx.state_dir());
    let decisions = store.list_decisions()?;

    if decisions.is_empty() {
        println!("No decisions recorded.");
    }
    for (slug, document) in &decisions {
        let summary = parse_summary(document).unwrap_or_else(|| slug.clone());
        let choice = parse_choice(document).unwrap_or_else(|| "(no choice)".to_string());
        println!("{} -> {}", summary, style(choice).green());
    }

    for request in pending_requests(&store)? {
        println!(
            "{} {} [{}]",
            style("pending:").yellow(),
            request.summary,
            request.options.join(" | ")
        );
    }
    Ok(())
}
