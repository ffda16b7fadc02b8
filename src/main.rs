use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use stagegate::context::ProjectContext;

mod cmd;

#[derive(Parser)]
#[command(name = "stagegate")]
#[command(version, about = "Stage-gated, LLM-assisted build pipeline")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory holding state/ and stagegate.toml (defaults to the engine root)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline: bootstrap, design, implement, test, verify
    Run {
        /// Where decisions come from: prompt or file (overrides stagegate.toml)
        #[arg(long)]
        decisions: Option<String>,
    },
    /// Run a single stage
    Stage {
        /// bootstrap, design, implement, test, or verify
        name: String,

        /// Where decisions come from: prompt or file (overrides stagegate.toml)
        #[arg(long)]
        decisions: Option<String>,
    },
    /// Show inputs, stage outputs, decisions, and ledger size
    Status,
    /// Print the execution ledger
    Trace,
    /// List recorded and pending decisions
    Decisions,
    /// Answer a pending decision
    Decide {
        /// The chosen option (text or 1-based number)
        choice: String,

        /// Which pending decision to answer when more than one is waiting
        #[arg(long)]
        summary: Option<String>,
    },
    /// View, validate, or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default stagegate.toml in the project directory
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    stagegate::logging::init(cli.verbose);

    let ctx = ProjectContext::new(cli.project_dir.as_deref())?;
    match dotenvy::from_path(ctx.dotenv_path()) {
        Ok(()) => tracing::debug!(path = %ctx.dotenv_path().display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load {}: {}", ctx.dotenv_path().display(), e),
    }

    match &cli.command {
        Commands::Run { decisions } => {
            cmd::run_pipeline(&ctx, decisions.as_deref(), cli.verbose).await?;
        }
        Commands::Stage { name, decisions } => {
            cmd::run_single_stage(&ctx, name, decisions.as_deref(), cli.verbose).await?;
        }
        Commands::Status => cmd::cmd_status(&ctx)?,
        Commands::Trace => cmd::cmd_trace(&ctx)?,
        Commands::Decisions => cmd::cmd_decisions(&ctx)?,
        Commands::Decide { choice, summary } => {
            cmd::cmd_decide(&ctx, choice, summary.as_deref())?
        }
        Commands::Config { command } => cmd::cmd_config(&ctx, command.clone())?,
    }

    Ok(())
}
