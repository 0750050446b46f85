//! `daxpilot` command-line front end

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use daxpilot_core::config::{self, AppConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Local-model chat, DAX generation against Fabric and text insights
#[derive(Parser)]
#[command(name = "daxpilot", version, about)]
pub struct Cli {
    /// YAML or JSON config file; the environment is used when omitted
    #[arg(short, long, global = true, env = "DAXPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat with the local models; reads prompts from stdin without PROMPT
    Chat {
        prompt: Option<String>,
        /// Always use this model instead of routing
        #[arg(short, long)]
        model: Option<String>,
        /// Answer with canned replies instead of calling the server
        #[arg(long)]
        demo: bool,
    },

    /// Show which model a prompt would be routed to
    Route { prompt: String },

    /// List the models offered by the local server
    Models {
        #[arg(long)]
        refresh: bool,
    },

    /// Acquire a Power BI token and show its expiry
    Auth,

    /// List accessible workspaces
    Workspaces {
        #[arg(long)]
        refresh: bool,
    },

    /// List datasets of a workspace
    Datasets {
        #[arg(long, env = "POWER_BI_WORKSPACE_ID")]
        workspace: String,
    },

    /// List tables of a dataset
    Tables {
        #[command(flatten)]
        target: Target,
    },

    /// Generate, check or refine DAX
    Dax {
        #[command(subcommand)]
        command: DaxCommands,
    },

    /// Run a DAX query against a dataset
    Query {
        dax: String,
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate DAX for a question and run it
    Ask {
        question: String,
        #[arg(short, long)]
        model: Option<String>,
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Sentiment, key phrases and entities for a text
    Insights {
        text: String,
        /// Use the keyword analyzer even when the service is configured
        #[arg(long)]
        mock: bool,
        /// Write the insight history to this file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Stars, forks and issues of a GitHub repository
    GithubStats {
        /// `owner/repo`; defaults to the configured repository
        repo: Option<String>,
        #[arg(long)]
        refresh: bool,
    },

    /// Print the effective configuration with secrets redacted
    Config,
}

#[derive(Subcommand)]
pub enum DaxCommands {
    /// Turn a question into a query
    Generate {
        question: String,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Run the local sanity checks on a query
    Validate { query: String },
    /// Rework a query given feedback or an error message
    Refine {
        query: String,
        feedback: String,
        #[arg(short, long)]
        model: Option<String>,
    },
}

/// Workspace and dataset to run against
#[derive(clap::Args)]
pub struct Target {
    #[arg(long, env = "POWER_BI_WORKSPACE_ID")]
    pub workspace: Option<String>,
    #[arg(long, env = "POWER_BI_DATASET_ID")]
    pub dataset: Option<String>,
}

#[derive(clap::Args)]
pub struct OutputArgs {
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
    Summary,
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => config::load_from_path(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => config::from_env().context("reading configuration from the environment"),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing(&config);

    commands::run(cli.command, config).await
}
