//! Meterline API Server
//!
//! This crate provides the OTLP receivers for Meterline. Every export
//! request, whether it arrives over HTTP or gRPC, is handed to a
//! [`MetricsExporter`], which writes flattened rows to the configured sinks
//! and registers metric descriptors with the data catalog.
//!
//! # Architecture
//!
//! - `GET /health` and `POST /v1/metrics` on an Axum router
//! - the OTLP `MetricsService` on a tonic server bound to a separate port
//! - both servers share one [`AppState`] and stop on the same signal
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod db;
pub mod exporter;
pub mod grpc;
mod routes;
mod state;

pub use config::Config;
pub use exporter::{ExportError, ExportSummary, InMemorySinks, MetricsExporter};
pub use routes::{ExportResponse, OtlpError, PartialSuccess};
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use db::Database;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the Meterline API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - A sink cannot be prepared
/// - A server fails to bind to its configured address
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Meterline API server with the provided configuration.
///
/// When a `ClickHouse` sink is configured, its row table is created before
/// the listeners start.
///
/// # Errors
///
/// Returns an error if:
/// - The `ClickHouse` row table cannot be created
/// - A sink cannot be prepared
/// - A server fails to bind to its configured address
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let http_addr = config.socket_addr()?;
    let grpc_addr = config.grpc_socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        grpc_port = %config.grpc_port,
        "Meterline API server starting"
    );

    if let Some(clickhouse) = &config.export.clickhouse {
        Database::new(clickhouse).ensure_schema().await?;
    }

    let exporter = MetricsExporter::from_settings(&config.export)?;
    let state = AppState::new(Arc::new(exporter));

    let app = create_router(state.clone());
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind {http_addr}"))?;

    tracing::info!(%http_addr, %grpc_addr, "Listening for connections");

    let http = async {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")
    };
    let grpc = async {
        tonic::transport::Server::builder()
            .add_service(grpc::MetricsServiceImpl::new(state).into_server())
            .serve_with_shutdown(grpc_addr, shutdown_signal())
            .await
            .context("gRPC server failed")
    };

    tokio::try_join!(http, grpc)?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::otlp_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
