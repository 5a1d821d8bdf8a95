mod metrics_observer;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics::Metrics;
use metrics::server::{MetricsServerConfig, run_metrics_server};
use networking::{DummyP2pService, InMemoryBlockSource, InMemoryTxPool, P2pClient, P2pConfig};
use tokio::task;
use tracing::{error, info};

use crate::metrics_observer::MetricsObserver;

#[derive(Parser, Debug)]
struct Args {
    /// Block source poll interval in milliseconds, overrides P2P_CHECK_INTERVAL
    #[arg(long)]
    check_interval: Option<u64>,

    /// Maximum number of blocks buffered ahead of reconciliation, overrides P2P_L2_QUEUE_SIZE
    #[arg(long)]
    l2_queue_size: Option<usize>,

    /// Number of confirmed blocks the local devnet chain starts with
    #[arg(long, default_value_t = 0)]
    initial_blocks: u64,

    #[arg(long, default_value = "127.0.0.1")]
    metrics_address: IpAddr,

    #[arg(long, default_value_t = 5054)]
    metrics_port: u16,

    #[arg(long)]
    disable_metrics: bool,
}

fn load_config(args: &Args) -> Result<P2pConfig> {
    load_config_with(args, |key| std::env::var(key).ok())
}

/// Config from `lookup`, then CLI overrides on top.
fn load_config_with(args: &Args, lookup: impl Fn(&str) -> Option<String>) -> Result<P2pConfig> {
    let mut config =
        P2pConfig::from_lookup(lookup).context("failed to read p2p config from environment")?;

    if let Some(millis) = args.check_interval {
        config.check_interval = Duration::from_millis(millis);
    }
    if let Some(queue_size) = args.l2_queue_size {
        config.l2_queue_size = queue_size;
    }

    config.validate().context("invalid p2p config")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let metrics = Arc::new(Metrics::new());
    if !args.disable_metrics {
        let server_config = MetricsServerConfig {
            metrics_address: args.metrics_address,
            metrics_port: args.metrics_port,
        };
        let metrics = metrics.clone();
        task::spawn(async move {
            if let Err(err) = run_metrics_server(server_config, metrics).await {
                error!("Metrics server exited with error: {err:#}");
            }
        });
    }

    let block_source = Arc::new(InMemoryBlockSource::with_empty_blocks(args.initial_blocks));
    let client = P2pClient::new_with_observer(
        block_source,
        InMemoryTxPool::new(),
        Arc::new(DummyP2pService),
        &config,
        Arc::new(MetricsObserver::new(metrics)),
    );

    info!(
        check_interval_ms = config.check_interval.as_millis() as u64,
        l2_queue_size = config.l2_queue_size,
        initial_blocks = args.initial_blocks,
        "Starting p2p client"
    );
    client.start().await.context("p2p client failed to sync")?;

    let status = serde_json::to_string(&client.get_status())?;
    info!(%status, "P2p client ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Stopping p2p client...");
    client.stop().await;
    info!("P2p client stopped");

    Ok(())
}
