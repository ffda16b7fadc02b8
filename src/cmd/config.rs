//! Configuration view and validation commands - `stagegate config`.

use anyhow::Result;

use stagegate::config::{PROVIDER_ENV, PipelineConfig};
use stagegate::context::{CONFIG_FILE, ProjectContext};

use super::super::ConfigCommands;

fn print_config(config: &PipelineConfig) {
    println!("[llm]");
    println!("  provider = \"{}\"", config.llm.provider);
    println!("[llm.claude]");
    println!("  model = \"{}\"", config.llm.claude.model);
    println!("  max_tokens = {}", config.llm.claude.max_tokens);
    println!("[llm.openai]");
    println!("  model = \"{}\"", config.llm.openai.model);
    if let Some(base_url) = &config.llm.openai.base_url {
        println!("  base_url = \"{}\"", base_url);
    }
    println!("[llm.claude_cli]");
    println!("  command = \"{}\"", config.llm.claude_cli.command);
    if let Some(model) = &config.llm.claude_cli.model {
        println!("  model = \"{}\"", model);
    }
    println!("[notifications]");
    println!("  enabled = {}", config.notifications.enabled);
    println!("  method = \"{}\"", config.notifications.method);
    println!("[gates]");
    println!("  source = \"{}\"", config.gates.source);
    println!("  poll_interval_secs = {}", config.gates.poll_interval_secs);
    println!();
}

pub fn cmd_config(ctx: &ProjectContext, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = ctx.config_path();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("stagegate configuration");
            println!("=======================");
            println!();

            let config = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                PipelineConfig::load(&config_path)?
            } else {
                println!("No {} found at {}", CONFIG_FILE, config_path.display());
                println!("Using default configuration.");
                PipelineConfig::default()
            };
            println!();
            print_config(&config);

            println!("Effective values (with env overrides):");
            println!("  provider = \"{}\"", config.provider_name());
            if std::env::var(PROVIDER_ENV).is_ok() {
                println!("  ({} is set)", PROVIDER_ENV);
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE);
                return Ok(());
            }

            let config = PipelineConfig::load(&config_path)?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            let local = ctx.project_dir().join(CONFIG_FILE);
            if local.exists() {
                println!("{} already exists at {}", CONFIG_FILE, local.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            PipelineConfig::default().save(&local)?;

            println!("Created {} at {}", CONFIG_FILE, local.display());
            println!();
            println!("You can now customize:");
            println!("  - [llm] provider and per-backend model settings");
            println!("  - [notifications] enabled, method, targets");
            println!("  - [gates] decision source and poll interval");
            println!();
        }
    }

    Ok(())
}
