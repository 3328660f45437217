//! Authorizing image proxy.
//!
//! Lets browser clients load remote images they cannot fetch directly
//! (CORS, hotlink protection) by fetching them server-side.
//!
//! # Architecture Overview
//!
//! ```text
//!   GET /{encoded url}?access_token=...
//!        │
//!        ▼
//!   ┌──────────┐   ┌────────────┐   ┌────────────┐   ┌───────────┐   ┌───────────┐
//!   │   CORS   │──▶│ authorizer │──▶│ decode URL │──▶│  fetcher  │──▶│ validator │
//!   └──────────┘   └─────┬──────┘   └─────┬──────┘   └─────┬─────┘   └─────┬─────┘
//!                        │ 401            │ 400            │ 500           │ 415 / upstream status
//!                        ▼                ▼                ▼               ▼
//!                  ┌──────────────────────────────────────────────┐   ┌───────────┐
//!                  │             plain-text error reply            │   │  stream   │──▶ client
//!                  └──────────────────────────────────────────────┘   └───────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use image_proxy::config::load_config;
use image_proxy::http::HttpServer;
use image_proxy::lifecycle::{signals, Shutdown};
use image_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "image-proxy")]
#[command(about = "Authorizing proxy that fetches remote images for browser clients", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!("image-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        auth_mode = ?config.auth.mode,
        allowed_content_types = ?config.validation.allowed_content_types,
        upstream_timeout_secs = config.upstream.timeout_secs,
        upstream_read_timeout_secs = config.upstream.read_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Image proxy listening");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(&config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
