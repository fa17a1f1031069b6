//! Off-chain price oracle.
//!
//! # Architecture Overview
//!
//! ```text
//!   Exchange REST API                         Oracle contract (on chain)
//!         │                                     ▲                │
//!         ▼                                     │ fulfill        │ PriceValidationRequested
//!  ┌──────────────┐   writes   ┌──────────┐    │                ▼
//!  │ price poller │──────────▶│  price   │  ┌─┴──────────┐  ┌────────────────┐
//!  └──────────────┘           │  table   │◀─│ submitter  │◀─│ event listener │
//!                             └────┬─────┘  └────────────┘  └────────────────┘
//!                                  │              ▲                 │
//!                                  ▼              │                 ▼
//!                          ┌──────────────┐   ┌───┴──────────────────────┐
//!                          │ query facade │──▶│ attestation signer (712) │
//!                          └──────┬───────┘   └──────────────────────────┘
//!                                 ▼
//!                           HTTP surface
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use price_oracle::blockchain::Wallet;
use price_oracle::config::load_config;
use price_oracle::engine::{OracleEngine, QueryFacade};
use price_oracle::http::HttpServer;
use price_oracle::lifecycle::{wait_for_shutdown_signal, Shutdown};
use price_oracle::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "price-oracle")]
#[command(about = "Off-chain price oracle", long_about = None)]
struct Args {
    /// TOML configuration file; defaults plus ORACLE_* variables when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability)?;

    tracing::info!("price-oracle v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        rpc_url = %config.node.rpc_url,
        contract = %config.oracle.contract_address,
        pairs = ?config.oracle.asset_pairs,
        poll_interval_secs = config.oracle.poll_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let wallet = Wallet::from_env()?;
    let http_config = config.http.clone();
    let engine = Arc::new(OracleEngine::new(config, wallet)?);

    // Bind before any task starts so a taken port fails startup cleanly.
    let listener = if http_config.enabled {
        Some(TcpListener::bind(&http_config.bind_address).await?)
    } else {
        None
    };

    engine.start().await?;

    let shutdown = Shutdown::new();
    let http_task = if let Some(listener) = listener {
        let server = HttpServer::new(&http_config, QueryFacade::new(engine.clone()));
        let mut signal = shutdown.subscribe();
        Some(tokio::spawn(async move {
            server.run(listener, async move { signal.recv().await }).await
        }))
    } else {
        None
    };

    wait_for_shutdown_signal().await;
    tracing::info!("Shutting down");

    shutdown.trigger();
    engine.stop().await;

    if let Some(task) = http_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error"),
            Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
