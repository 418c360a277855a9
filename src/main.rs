//! Stressless workbench backend.
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser UI
//!       │
//!       ▼
//!   ┌──────────────────────── http (axum) ────────────────────────┐
//!   │ request id → trace → body timeout → CORS → handlers          │
//!   └───┬──────────────┬──────────────────┬──────────────┬────────┘
//!       │              │                  │              │
//!       ▼              ▼                  ▼              ▼
//!    proxy         discovery ──────▶  events hub      presets / auth
//!       │              │                  │
//!       ▼              ▼                  ▼
//!    net client (shared reqwest)      SSE subscribers
//!       │
//!       ▼
//!    upstream servers
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use stressless_server::config::loader::load_or_default;
use stressless_server::lifecycle::shutdown_signal;
use stressless_server::observability::{logging, metrics};
use stressless_server::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "stressless-server")]
#[command(about = "Backend for the Stressless API workbench", long_about = None)]
struct Args {
    /// Path to the TOML configuration file (optional).
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_found = args.config.exists();
    let mut config = load_or_default(&args.config)?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "stressless-server starting");
    if !config_found {
        tracing::info!(path = %args.config.display(), "Config file not found, using defaults");
    }
    tracing::info!(
        bind_address = %config.listener.bind_address,
        presets = %config.presets.path,
        static_root = %config.static_files.root,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move {
            shutdown_signal().await;
            shutdown.trigger();
        }
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
