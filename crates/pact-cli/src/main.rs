mod config;
mod plan_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pact_core::{ModelConfig, ModelInvoker, PlanEngine};

use config::PactConfig;

#[derive(Parser)]
#[command(name = "pact", about = "Learning-plan generation on top of a text model")]
struct Cli {
    /// Chat-completions endpoint URL (overrides PACT_API_URL env var)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a pact config file (API key taken from PACT_API_KEY if set)
    Init {
        /// Model identifier sent with every request
        #[arg(long, default_value = ModelConfig::DEFAULT_MODEL_ID)]
        model_id: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    #[command(flatten)]
    Plan(PlanCommands),
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate a learning plan for a topic
    Generate {
        /// Topic to learn (1-100 characters)
        topic: String,
        /// Plan depth: quick or deep
        #[arg(long, default_value = "quick")]
        mode: String,
    },
    /// Rework a plan using learner feedback
    Refine {
        /// JSON file holding the current plan
        #[arg(long)]
        plan: PathBuf,
        /// One piece of feedback (repeatable)
        #[arg(long)]
        insight: Vec<String>,
    },
    /// Generate a short practice plan for one difficulty
    Remedial {
        /// Topic being studied
        topic: String,
        /// What the learner struggles with (5-200 characters)
        struggle_point: String,
    },
    /// Explain one task of a plan in more detail
    Elaborate {
        /// Topic being studied
        topic: String,
        /// The task description to expand
        task_description: String,
    },
    /// Ask the coach a question
    Ask {
        /// The question
        question: String,
        /// Topic being studied
        #[arg(long)]
        topic: Option<String>,
        /// Current subtask (repeatable)
        #[arg(long)]
        subtask: Vec<String>,
    },
    /// Generate a plan from a text document
    FromDoc {
        /// Path to the document (at least 100 characters)
        file: PathBuf,
    },
}

/// Execute the `pact init` command: write config file.
fn cmd_init(api_url: Option<&str>, model_id: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let api_key = std::env::var("PACT_API_KEY").unwrap_or_else(|_| "YOUR_API_KEY".to_string());
    let api_url = api_url.unwrap_or(ModelConfig::DEFAULT_API_URL);

    let cfg = config::ConfigFile {
        model: config::ModelSection {
            api_url: api_url.to_string(),
            api_key: api_key.clone(),
            model_id: model_id.to_string(),
            timeout_secs: None,
            max_retry: None,
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  model.api_url = {api_url}");
    println!("  model.model_id = {model_id}");
    println!("  model.api_key = {}", mask_key(&api_key));
    if api_key == "YOUR_API_KEY" {
        println!();
        println!("Next: put your API key in the config file or set PACT_API_KEY.");
    }

    Ok(())
}

fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}...")
}

/// Resolve configuration and build the engine over the HTTP model client.
fn build_engine(cli_api_url: Option<&str>) -> anyhow::Result<PlanEngine> {
    let resolved = PactConfig::resolve(cli_api_url)?;
    tracing::debug!(model = ?resolved.model, "resolved model configuration");
    let invoker =
        ModelInvoker::new(Arc::new(resolved.model)).context("failed to build model client")?;
    Ok(PlanEngine::new(Arc::new(invoker)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { model_id, force } => {
            cmd_init(cli.api_url.as_deref(), &model_id, force)?;
        }
        Commands::Serve { bind, port } => {
            let engine = build_engine(cli.api_url.as_deref())?;
            serve_cmd::run_serve(Arc::new(engine), &bind, port).await?;
        }
        Commands::Plan(command) => {
            let engine = build_engine(cli.api_url.as_deref())?;
            plan_cmds::run_plan_command(command, &engine).await?;
        }
    }

    Ok(())
}
