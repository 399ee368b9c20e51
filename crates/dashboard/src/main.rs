// crates/dashboard/src/main.rs
//! `jobwatch` binary.
//!
//! Connects the update channel to a job board and logs what the board shows:
//! connection changes, each activity line and the active-job list whenever it
//! changes. `submit` additionally sends a staggered demo batch once the hub is
//! reachable.

mod render;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use jobwatch_aggregator::{AggregatorConfig, JobStateAggregator};
use jobwatch_jobs::{HttpJobApi, JobApi, JobOrchestrator};
use jobwatch_live::{hub_url_from_api, ChannelConfig, ConnectionState, StatusStream, UpdateChannelClient};
use jobwatch_observability::{init_tracing, LogFormat};
use jobwatch_types::{ActiveJob, API_URL_ENV, DEFAULT_API_URL, HUB_URL_ENV};
use tracing::{debug, error, info, warn};

/// How long `submit` waits for the hub before sending anyway.
const CONNECT_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "jobwatch", version, about = "Follow live job progress")]
struct Cli {
    /// Job API base URL.
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Progress hub URL. Derived from the API URL when omitted.
    #[arg(long, env = HUB_URL_ENV, global = true)]
    hub_url: Option<String>,

    /// Log JSON lines instead of compact text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Follow the hub and log board changes (default).
    Watch,
    /// Submit a staggered batch of demo jobs, then follow them.
    Submit {
        /// Number of jobs, 1 to 6.
        #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=6))]
        count: u8,
    },
    /// Print the server's job list as JSON and exit.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_tracing(format).context("failed to initialise logging")?;
    if !install_crypto_provider() {
        debug!("rustls crypto provider already installed");
    }

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(&cli, None).await,
        Command::Submit { count } => watch(&cli, Some(count)).await,
        Command::Status => print_status(&cli).await,
    }
}

/// Install aws-lc-rs as the process-wide rustls provider. reqwest and
/// tungstenite may both pull one in. Returns false if one was already set.
fn install_crypto_provider() -> bool {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_ok()
}

fn channel_config(cli: &Cli) -> ChannelConfig {
    let hub_url = cli
        .hub_url
        .clone()
        .unwrap_or_else(|| hub_url_from_api(&cli.api_url));
    ChannelConfig::default().with_hub_url(hub_url)
}

async fn print_status(cli: &Cli) -> Result<()> {
    let api = HttpJobApi::new(cli.api_url.clone())?;
    let jobs = api
        .job_status()
        .await
        .with_context(|| format!("failed to fetch job status from {}", api.api_url()))?;
    println!("{}", serde_json::to_string_pretty(&jobs)?);
    Ok(())
}

async fn watch(cli: &Cli, submit: Option<u8>) -> Result<()> {
    let board = JobStateAggregator::spawn(AggregatorConfig::default());
    let client = UpdateChannelClient::new(channel_config(cli));
    info!(hub = %client.config().hub_url, api = %cli.api_url, "starting jobwatch");
    board.follow(client.subscribe_events());
    let status_logger = tokio::spawn(log_status(client.subscribe_status()));
    client.start();

    if let Some(count) = submit {
        let orchestrator =
            JobOrchestrator::new(HttpJobApi::new(cli.api_url.clone())?, board.clone());
        if !wait_connected(&client, CONNECT_GRACE).await {
            warn!("hub not reachable yet; progress will show once it connects");
        }
        match orchestrator.submit_planned(usize::from(count)).await {
            Ok(response) => info!(count, %response, "submitted demo jobs"),
            Err(e) => error!(error = %e, "job submission failed"),
        }
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut snapshots = board.subscribe();
    let mut last_seq = 0;
    let mut shown: Vec<ActiveJob> = Vec::new();
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    warn!(error = %e, "ctrl-c handler failed");
                }
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                for entry in render::new_activity(&snapshot, last_seq) {
                    info!(job_id = %entry.job_id, "{}", render::activity_line(entry));
                }
                if let Some(newest) = snapshot.recent_activity.first() {
                    last_seq = last_seq.max(newest.seq);
                }
                if snapshot.active_jobs != shown {
                    info!(
                        active = snapshot.active_jobs.len(),
                        "board\n{}",
                        render::board_summary(&snapshot, Utc::now())
                    );
                    shown = snapshot.active_jobs;
                }
            }
        }
    }

    info!("shutting down");
    client.stop().await;
    board.shutdown().await;
    status_logger.abort();
    Ok(())
}

async fn wait_connected(client: &UpdateChannelClient, limit: Duration) -> bool {
    let mut status = client.subscribe_status();
    tokio::time::timeout(limit, async {
        while let Some(state) = status.next().await {
            if state.is_connected() {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

async fn log_status(mut status: StatusStream) {
    while let Some(state) = status.next().await {
        match state {
            ConnectionState::Connected => info!(%state, "live updates connected"),
            ConnectionState::AwaitingRetry => warn!(%state, "live updates unavailable, retrying"),
            ConnectionState::Connecting | ConnectionState::Disconnected => {
                debug!(%state, "live updates")
            }
        }
    }
}
