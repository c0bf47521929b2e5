//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Bind the listener and serve until a signal arrives
//! - Give in-flight requests a bounded grace period on shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;

use crate::config::validation::validate_config;
use crate::config::{load_config, ConfigError, GatewayConfig};
use crate::http::{HttpServer, StateError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "roomy-gateway", version, about = "API gateway for the Roomy expense-splitting app")]
pub struct Cli {
    /// TOML configuration file. Defaults plus environment variables are used
    /// when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address, overriding the file and `ROOMY_BIND_ADDRESS`.
    #[arg(short, long)]
    pub bind: Option<String>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    State(#[from] StateError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Resolve the final configuration from CLI arguments.
pub fn resolve_config(cli: &Cli) -> Result<GatewayConfig, ConfigError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

/// Start the gateway and block until it has shut down.
pub async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = resolve_config(&cli)?;
    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        backend = %config.backend.base_url,
        rate_limit = config.rate_limit.enabled,
        cors = config.cors.enabled,
        "Configuration loaded"
    );
    if config.wallet.publishable_key.is_empty() {
        tracing::warn!("No wallet publishable key configured");
    }
    tracing::debug!(
        secret_key_present = config.wallet.has_secret_key(),
        chain_id = config.wallet.chain_id,
        "Wallet credentials"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let grace = Duration::from_secs(config.listener.shutdown_grace_secs);
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            addr: bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);
    let mut notified = shutdown.subscribe();
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut serving => return flatten(result),
        _ = notified.recv() => {}
    }

    tracing::info!(grace_secs = grace.as_secs(), "Draining in-flight requests");
    match tokio::time::timeout(grace, &mut serving).await {
        Ok(result) => flatten(result)?,
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, aborting remaining requests");
            serving.abort();
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn flatten(result: Result<Result<(), std::io::Error>, JoinError>) -> Result<(), StartupError> {
    match result {
        Ok(inner) => inner.map_err(StartupError::Server),
        Err(e) => Err(StartupError::Server(std::io::Error::other(e))),
    }
}
