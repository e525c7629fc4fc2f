//! evmap-discovery - Event Discovery Microservice
//!
//! **Module Identity:**
//! - Name: evmap-discovery
//! - Default port: 5790
//!
//! Turns natural-language event requests into structured queries, resolves
//! them against Meetup (primary) and Eventbrite (secondary) under circuit
//! breaking, retry and fallback, and serves the results as agent tools.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use evmap_common::config::load_config;
use evmap_common::events::EventBus;
use evmap_common::SystemClock;
use evmap_discovery::services::DiscoveryService;
use evmap_discovery::{AppState, MODULE_NAME};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for evmap-discovery
#[derive(Parser, Debug)]
#[command(name = "evmap-discovery")]
#[command(about = "Event discovery microservice for evmap")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "EVMAP_DISCOVERY_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config before tracing so logging.level can seed the filter
    let config = load_config(args.config.as_deref(), MODULE_NAME)
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("evmap_discovery={0},evmap_common={0},tower_http=info", config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} (Event Discovery) microservice", MODULE_NAME);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let event_bus = EventBus::new(config.discovery.event_bus_capacity);
    info!("Event bus initialized");

    let service = DiscoveryService::from_config(&config, event_bus, Arc::new(SystemClock))
        .context("Failed to initialize discovery service")?;

    let app = evmap_discovery::build_router(AppState::new(Arc::new(service)));

    let bind = args.bind.unwrap_or_else(|| config.bind_address.clone());
    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
