//! Runscope console binary.
//!
//! `runscope --run <RUN_ID>` opens the SSE stream for a run and either
//! launches the interactive dashboard (default) or, with `--headless`,
//! follows the run to a terminal state and prints the derived stage
//! groups as JSON.

mod app;
mod config;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use runscope_protocol::StageCatalog;
use runscope_state::derive_stage_groups;
use runscope_stream::{SessionBudgets, StreamClient, StreamStatus};

use crate::app::App;
use crate::config::ConsoleConfig;

#[derive(Parser, Debug)]
#[command(name = "runscope", about = "Live dashboard for research pipeline runs")]
struct Args {
    /// Run id to follow.
    #[arg(long)]
    run: String,

    /// Config file path (defaults to ~/.config/runscope/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Follow the run without a UI and print stage groups as JSON once
    /// it reaches a terminal state.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.headless);

    let config = ConsoleConfig::load(args.config.as_deref())?;
    info!(backend = %config.backend_url, run_id = %args.run, "starting");

    // Reconnect budgets are session-scoped: any client created during
    // this process run shares the same per-run attempt history.
    let budgets = Arc::new(Mutex::new(SessionBudgets::new()));
    let mut client = StreamClient::with_session_budgets(config.stream_config(), budgets);
    client.connect(&args.run);

    if args.headless {
        run_headless(client).await
    } else {
        App::new(client, args.run).run().await
    }
}

/// In TUI mode, stderr writes would tear the alternate screen, so
/// tracing stays silent unless RUST_LOG opts in.
fn init_tracing(headless: bool) {
    let default_filter = if headless { "info" } else { "off" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Follow the stream until the run reaches a terminal status (or the
/// connection gives up), then dump the derived stage groups to stdout.
async fn run_headless(client: StreamClient) -> Result<()> {
    let log = client.log();
    let mut status_rx = client.status();
    let mut revision_rx = client.revisions();
    let catalog = StageCatalog::standard();

    loop {
        {
            let log = log.read().await;
            if log.run_status().is_terminal() {
                let groups = derive_stage_groups(log.events(), &catalog, log.run_status());
                println!("{}", serde_json::to_string_pretty(&groups)?);
                return Ok(());
            }
        }

        tokio::select! {
            changed = revision_rx.changed() => {
                if changed.is_err() {
                    bail!("stream worker dropped before the run finished");
                }
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    bail!("stream worker dropped before the run finished");
                }
                match *status_rx.borrow() {
                    StreamStatus::Failed => bail!("connection lost and reconnect budget exhausted"),
                    StreamStatus::Cancelled => bail!("stream cancelled before the run finished"),
                    _ => {}
                }
            }
        }
    }
}
