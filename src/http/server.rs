//! HTTP server startup logic.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::Router;
use axum_server::Handle;

use crate::config::HttpServerConfig;

use super::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen host '{0}': {1}")]
    Address(String, std::net::AddrParseError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Resolve the configured host and port into a socket address.
///
/// The host must be an IPv4 or IPv6 literal, without brackets.
pub fn listen_addr(config: &HttpServerConfig) -> Result<SocketAddr, ServerError> {
    let ip: IpAddr = config
        .host
        .parse()
        .map_err(|e| ServerError::Address(config.host.clone(), e))?;
    Ok(SocketAddr::new(ip, config.port))
}

/// Start the HTTP server.
///
/// This function blocks until the server has shut down gracefully.
pub async fn start_server(app: Router, config: &HttpServerConfig) -> Result<(), ServerError> {
    let addr = listen_addr(config)?;
    let handle = Handle::new();

    shutdown::setup_shutdown_handler(
        handle.clone(),
        Duration::from_secs(config.shutdown_grace_seconds),
    );

    tracing::info!(%addr, "Starting HTTP server");

    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
