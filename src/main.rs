//! Swap Cards Daemon
//!
//! Serves the swap cards read API over a local SQLite store.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! swap-cards
//!
//! # Start with custom config
//! swap-cards --config /path/to/config.toml
//!
//! # Override port, storage directory and latency budget
//! swap-cards --http-port 8096 --storage-dir /data/swaps --latency-budget-ms 150
//! ```
//!
//! ## HTTP API
//!
//! - `GET /health` - Health check
//! - `GET /api/swaps/cards?limit=&offset=` - Swap cards for the `x-viewer-id` viewer

use clap::Parser;
use swap_cards::services::events::spawn_logging_listener;
use swap_cards::{Config, HttpServer, Services, SwapDb};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "swap-cards")]
#[command(about = "Swap card aggregation service")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "SWAP_CARDS_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory for the SQLite database
    #[arg(long, env = "SWAP_CARDS_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "SWAP_CARDS_HTTP_PORT")]
    http_port: Option<u16>,

    /// Aggregation latency budget in milliseconds
    #[arg(long)]
    latency_budget_ms: Option<u64>,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("swap_cards=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(budget) = args.latency_budget_ms {
        config.latency_budget_ms = budget;
    }

    config.validate()?;

    info!(
        storage_dir = ?config.storage_dir,
        http_port = config.http_port,
        latency_budget_ms = config.latency_budget_ms,
        "Starting swap-cards"
    );

    let db = Arc::new(SwapDb::open(&config)?);
    let config = Arc::new(config);
    let services = Arc::new(Services::new(db, &config));
    let _listener = spawn_logging_listener(services.events.clone());

    let bind_addr: SocketAddr = format!("{}:{}", args.bind, config.http_port).parse()?;
    let server = Arc::new(HttpServer::new(services, config, bind_addr));

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server failed");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
