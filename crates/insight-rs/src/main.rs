//! `insight` command line: run the HTTP server or a workflow demo in-process.

mod demo;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use insight_rs::config::InsightConfig;
use insight_rs::core::WorkflowServices;
use insight_rs::protocol::DomainKind;
use insight_rs::server::{AppState, LogMailRelay, serve};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line options for the Insight binary.
#[derive(Parser)]
#[command(name = "insight", version, about)]
struct Cli {
    /// Optional path to an insight.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one workflow end to end and print its events.
    Demo {
        /// Demo domain: secops, model, or blockchain
        #[arg(long)]
        domain: DomainKind,
        /// Records to generate (defaults to the configured batch size)
        #[arg(long)]
        count: Option<usize>,
        /// Stream this many live records instead of generating a batch (secops only)
        #[arg(long)]
        stream: Option<usize>,
        /// Filter criterion as key=value; repeatable
        #[arg(long = "filter", value_parser = demo::parse_filter)]
        filters: Vec<(String, String)>,
    },
}

/// Entry point for the Insight CLI.
#[tokio::main]
async fn main() -> Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            info!(
                "starting server (bind={}, cors={})",
                config.server.bind, config.server.cors
            );
            let state = AppState::new(
                config,
                WorkflowServices::simulated(),
                Arc::new(LogMailRelay),
                None,
            );
            serve(Arc::new(state)).await.context("server failed")?;
        }
        Command::Demo {
            domain,
            count,
            stream,
            filters,
        } => {
            let options = demo::DemoOptions {
                domain,
                count,
                stream_ticks: stream,
                filters: filters.into_iter().collect(),
            };
            demo::run(config, options).await?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<InsightConfig> {
    if let Some(path) = path {
        info!("loading config from path: {}", path.display());
        return InsightConfig::load_from_path(path).context("failed to load config");
    }
    let cwd = std::env::current_dir().context("cwd")?;
    info!("loading layered config from cwd: {}", cwd.display());
    let layered = InsightConfig::load_layered(&cwd).context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    Ok(layered.config)
}
