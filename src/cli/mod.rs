//! Command-line interface for parley.
//!
//! Provides an interactive chat loop, a one-shot `ask`, and a dump of the
//! resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::FileLogObserver;
use crate::config::{self, ResolvedConfig};
use crate::core::{ChatPipeline, EventBus};

pub mod chat;

/// parley - Event-driven conversational message processor
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to $PARLEY_CONFIG, then .parley/config.yaml discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Event log file (overrides the configured one)
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// Skip the simulated thinking delays
    #[arg(long, global = true)]
    pub no_delay: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Process a single message and print the reply
    Ask {
        /// Message text
        message: String,

        /// Print the full run record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut resolved = config::load_config(self.config.as_deref())?;
        if let Some(log) = self.log {
            resolved.log_file = log;
        }
        if self.no_delay {
            resolved.responder = resolved.responder.without_delays();
        }

        match self.command {
            Commands::Chat => chat::run(&resolved).await,
            Commands::Ask { message, json } => ask(&resolved, &message, json).await,
            Commands::Config => show_config(&resolved),
        }
    }
}

/// Bus with the file log attached. Other observers are added by the caller.
fn bus_with_file_log(config: &ResolvedConfig) -> Result<EventBus> {
    let file_log = FileLogObserver::open(&config.log_file)?;
    Ok(EventBus::new().with(Arc::new(file_log)))
}

/// One run awaited in the foreground
async fn ask(config: &ResolvedConfig, message: &str, json: bool) -> Result<()> {
    let pipeline = ChatPipeline::new(config.responder.clone(), bus_with_file_log(config)?);
    let run = pipeline
        .execute(message, &tokio_util::sync::CancellationToken::new())
        .await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&run).context("Failed to serialize run")?
        );
    } else if let Some(outcome) = run.outcome {
        println!("{}", outcome.text());
    }

    Ok(())
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    match &config.config_file {
        Some(path) => println!("# config file: {}", path.display()),
        None => println!("# config file: (none, using defaults)"),
    }
    print!(
        "{}",
        serde_yaml::to_string(config).context("Failed to render configuration")?
    );
    Ok(())
}
