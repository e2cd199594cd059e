use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod dispatcher;
mod embedding;
mod error;
mod evaluation;
mod models;
mod output;
mod providers;
mod server;
mod store;

use crate::config::Config;
use crate::models::{EvaluateRequest, EvaluateResponse};
use crate::output::OutputFormat;
use crate::server::AppState;

/// LLM Eval Arena - Compare LLM providers on a prompt and judge their answers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output - log each upstream request
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the evaluation HTTP API
    Serve {
        /// Address to listen on, overriding the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Evaluate the prompt and providers described in a TOML run file
    Run {
        /// Path to the run file
        run_file: PathBuf,

        /// Output format: plain or json
        #[arg(short, long, default_value = "plain")]
        output: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "llm_eval_arena=debug,info"
    } else {
        "llm_eval_arena=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.server.bind.clone());
            server::serve(AppState::from_config(&config), &addr).await
        }
        Commands::Run { run_file, output: format } => {
            let request = load_run_file(&run_file)?;
            let state = AppState::from_config(&config);
            let results = state
                .dispatcher
                .run(&request.prompt, &request.llm_configs)
                .await
                .context("Evaluation failed")?;

            let evaluation = EvaluateResponse {
                prompt: request.prompt,
                results,
            };
            output::print_evaluation(&evaluation, format);
            Ok(())
        }
    }
}

/// Load a run file: a prompt plus `[[llm_configs]]` tables
fn load_run_file(path: &Path) -> anyhow::Result<EvaluateRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file: {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML run file: {}", path.display()))
}
