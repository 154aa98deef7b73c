use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber;

use turnstile::config::TurnstileConfig;
use turnstile::http::{AppState, HttpServer};
use turnstile::ratelimit::LimiterRegistry;

/// HTTP admission control with per-client token buckets.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen address from the configuration
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Turnstile Admission Control Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TurnstileConfig::from_file(path)?,
        None => TurnstileConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    info!(
        listen_addr = %config.server.listen_addr,
        burst_capacity = config.rate_limiting.burst_capacity,
        refill_rate_per_sec = config.rate_limiting.refill_rate_per_sec,
        key_strategy = ?config.rate_limiting.key_strategy,
        "Configuration loaded"
    );

    // Initialize the limiter registry
    let registry = Arc::new(LimiterRegistry::new(
        config.rate_limiting.burst_capacity,
        config.rate_limiting.refill_rate_per_sec,
    ));
    info!("Limiter registry initialized");

    // Periodically evict buckets for clients that have gone quiet, so the
    // registry does not grow without bound.
    let idle_ttl = Duration::from_secs(config.rate_limiting.idle_ttl_secs);
    let sweep_interval = Duration::from_secs(config.rate_limiting.sweep_interval_secs);
    let sweeper_registry = Arc::clone(&registry);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            sweeper_registry.sweep_idle(idle_ttl);
        }
    });

    let state = AppState::new(registry, config.rate_limiting.key_strategy);
    let server = HttpServer::new(config.server.listen_addr, state);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Turnstile Admission Control Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
