//! # podrunner
//!
//! HTTP gateway that runs a single container workload on Kubernetes and answers with its
//! exit code and captured output.
//!
//! ## Request flow
//!
//! `POST /` with `{"image": ..., "command": ..., "args": [...]}`:
//!
//! 1. a pod with a unique name is created in the configured namespace
//! 2. the pod is polled until its container terminates or the poll timeout expires
//! 3. the container output is read and returned as `{"exit_code": ..., "output": ...}`
//! 4. the pod is deleted in the background, without delaying the response
//!
//! ## Crate Organization
//!
//! - **api/**: axum routes, API key middleware and the health check
//! - **config.rs**: configuration validation
//! - **error.rs**: mapping of execution errors to HTTP responses
//! - **main.rs**: application entry point and server setup
//!
//! The execution pipeline lives in `podrunner-core`; the Kubernetes client in `podrunner-kube`.

use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use axum::Router;
use clap::Parser;
use config::Config;
use podrunner_core::{client::UnitClient, gateway::Gateway, poller::PollSettings};
use podrunner_kube::KubeUnitClient;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod error;

/// Longest time shutdown waits for pending pod deletions
const DELETION_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a container on Kubernetes and return its exit code and output over HTTP
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(long, env = "PODRUNNER_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PODRUNNER_PORT", default_value = "8080")]
    port: u16,

    /// Namespace the pods are created in
    #[arg(long, env = "PODRUNNER_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Name of the single container in each pod
    #[arg(long, env = "PODRUNNER_CONTAINER_NAME", default_value = podrunner_kube::DEFAULT_CONTAINER)]
    container_name: String,

    /// Prefix of the generated pod names
    #[arg(long, env = "PODRUNNER_NAME_PREFIX", default_value = "podrunner")]
    name_prefix: String,

    /// Seconds between two pod status checks
    #[arg(long, env = "PODRUNNER_POLL_INTERVAL_SECS", default_value = "3")]
    poll_interval_secs: u64,

    /// Seconds to wait for a pod to terminate before giving up
    #[arg(long, env = "PODRUNNER_POLL_TIMEOUT_SECS", default_value = "120")]
    poll_timeout_secs: u64,

    /// API key required in the X-API-Key header (optional)
    #[arg(long, env = "PODRUNNER_API_KEY")]
    api_key: Option<String>,

    /// Logging level (info, debug, trace)
    #[arg(long, env = "PODRUNNER_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

type ApiContextRef = Arc<ApiContext>;

pub struct ApiContext {
    pub config: Config,
    pub gateway: Gateway<dyn UnitClient>,
    /// Cancelled once a shutdown signal is received
    pub shutdown: CancellationToken,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = Level::from_str(cli.log_level.to_lowercase().as_str()).unwrap_or(Level::INFO);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true),
        )
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    info!(version = %env!("CARGO_PKG_VERSION"), "Starting podrunner");

    let poll = PollSettings {
        interval: Duration::from_secs(cli.poll_interval_secs),
        timeout: Duration::from_secs(cli.poll_timeout_secs),
    };
    let config = match Config::try_new(
        cli.namespace,
        cli.container_name,
        cli.name_prefix,
        poll,
        cli.api_key,
    ) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        namespace = %config.namespace,
        container = %config.container_name,
        name_prefix = %config.namer.prefix(),
        poll_interval = ?config.poll.interval,
        poll_timeout = ?config.poll.timeout,
        api_key_required = config.api_key.is_some(),
        "Configuration validated successfully"
    );

    let client = match KubeUnitClient::try_default(&config.namespace, &config.container_name).await
    {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to load Kubernetes credentials");
            std::process::exit(1);
        }
    };

    let client: Arc<dyn UnitClient> = Arc::new(client);
    let gateway = Gateway::new(client, config.namer.clone(), config.poll);
    let deletions = gateway.deletions().clone();

    // Create shutdown signal handler
    let shutdown_token = CancellationToken::new();
    let shutdown_token_ = shutdown_token.clone();

    // Spawn a task to handle shutdown signals
    tokio::spawn(async move {
        handle_shutdown_signals(shutdown_token_).await;
    });

    let context = Arc::new(ApiContext {
        config,
        gateway,
        shutdown: shutdown_token.clone(),
    });

    let app = Router::new()
        .merge(api::router(Arc::clone(&context)))
        .with_state(context);

    let addr: SocketAddr = match format!("{}:{}", cli.host, cli.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse socket address: {}", e);
            std::process::exit(1);
        }
    };

    info!(addr = %addr, "Listening for connections");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server started, press Ctrl+C to stop");
    let server_handle = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_token))
        .await;

    match server_handle {
        Ok(_) => info!("Server shut down gracefully"),
        Err(e) => error!(error = %e, "Server error during shutdown"),
    }

    deletions.close();
    info!(pending = deletions.len(), "Waiting for pending pod deletions");
    if tokio::time::timeout(DELETION_DRAIN_TIMEOUT, deletions.wait())
        .await
        .is_err()
    {
        warn!(
            pending = deletions.len(),
            "Pod deletions still pending at shutdown, pods may be left behind"
        );
    }

    info!("podrunner shutdown complete");
}

/// Handler function for shutdown signals
async fn handle_shutdown_signals(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    // Signal the server and in-flight executions to shut down
    shutdown_token.cancel();
}

/// Returns a future that resolves when the shutdown signal is received
async fn shutdown_signal_handler(token: CancellationToken) {
    token.cancelled().await;
    info!("Shutdown signal received, starting graceful shutdown");

    // Give cancelled requests time to answer
    tokio::time::sleep(Duration::from_secs(1)).await;
}
