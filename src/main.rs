mod analyzer;
mod api;
mod config;
mod error;
mod models;
mod reporter;
mod rpc;

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::rpc::{BlockSource, BlockchainInfoClient};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Bitcoin block analyzer starting...");

    let cfg = config::load()?;

    // One upstream client shared by the API and the reporter
    let source: Arc<dyn BlockSource> = Arc::new(BlockchainInfoClient::new(
        &cfg.blockchain_api_url,
        cfg.request_timeout,
    )?);

    let api_handle = tokio::spawn({
        let cfg = cfg.clone();
        let source = Arc::clone(&source);
        async move { api::serve(cfg, source).await }
    });

    // Background reporter; exits immediately when REPORT_URL is unset
    tokio::spawn({
        let cfg = cfg.clone();
        let source = Arc::clone(&source);
        async move {
            if let Err(e) = reporter::run(cfg, source).await {
                error!("Reporter error: {:?}", e);
            }
        }
    });

    // Graceful shutdown
    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Bitcoin block analyzer stopped.");
    Ok(())
}
