//! User service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request       ┌──────────────────────────────────────────────────┐
//!     ─────────────────────┼─▶ http (axum + tower-http middleware)            │
//!                          │        │                                         │
//!                          │        ▼                                         │
//!                          │   users::UserService ──▶ CircuitBreaker ──┐      │
//!                          │        │                 (registry)       │      │
//!                          │        ▼                                  ▼      │
//!                          │   UserRepository                     fallback    │
//!                          │        │                          (503 degraded) │
//!                          │        ▼                                         │
//!                          │   EventPublisher ──▶ EventDispatcher task        │
//!                          │                                                  │
//!     Operator ────────────┼─▶ admin API (breaker status / reset / trip)     │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use user_service::config::load_config;
use user_service::lifecycle::wait_for_signal;
use user_service::observability::{logging, metrics};
use user_service::{Application, ServiceConfig, Shutdown};

#[derive(Parser)]
#[command(name = "user-service")]
#[command(about = "User CRUD service with circuit breakers", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "user-service starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        config_file = ?cli.config,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let admin_listener = if config.admin.enabled {
        Some(TcpListener::bind(&config.admin.bind_address).await?)
    } else {
        None
    };

    let shutdown = Arc::new(Shutdown::new());
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    Application::assemble(config)
        .run(listener, admin_listener, shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
