//! Upload gateway.
//!
//! Accepts single-file form uploads, verifies the file's real type from its
//! bytes, and promotes accepted files into public storage.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /upload
//!        │
//!        ▼
//!   ┌──────────┐   ┌────────────┐   ┌─────────┐   ┌──────────┐   ┌─────────┐
//!   │ security │──▶│  staging   │──▶│  sniff  │──▶│ promote  │──▶│  audit  │
//!   │ quota    │   │ temp_dir   │   │ magic # │   │ / discard│   │ log     │
//!   └──────────┘   └────────────┘   └─────────┘   └──────────┘   └─────────┘
//!        │                                                            │
//!        └──────────────── 303 redirect to /?status=… ◀──────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use upload_gateway::config;
use upload_gateway::lifecycle::{signals, startup, Shutdown};
use upload_gateway::observability::{logging, metrics};
use upload_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "upload-gateway")]
#[command(about = "Content-validating file upload server", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    logging::init(&config.observability);

    tracing::info!("upload-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_upload_bytes = config.limits.max_upload_bytes,
        rate_limit_window_ms = config.rate_limit.window_ms,
        rate_limit_max = config.rate_limit.max_attempts,
        allowed_types = ?config.allowed_types.0,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    startup::prepare_storage(&config.storage).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_shutdown().await;
        shutdown.trigger();
    });

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
