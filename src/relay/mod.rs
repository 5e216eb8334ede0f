//! Relay server that pushes air-quality readings to feed clients.
//!
//! Serves the WebSocket feed the live-feed client connects to, plus a small
//! REST API for one-off readings and index calculations.

pub mod config;
pub mod handlers;
pub mod router;
pub mod source;
pub mod websocket;

// Re-export commonly used items
pub use config::RelayConfig;
pub use router::create_app;
pub use source::{validate_coordinates, CachedSource, ReadingSource, SimulatedSource};

use crate::error::{Result, SentinelError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub source: Arc<dyn ReadingSource>,
}

impl RelayState {
    pub fn new(config: RelayConfig, source: Arc<dyn ReadingSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
        }
    }
}

/// The reading source used when none is supplied: simulated data behind the
/// configured cache.
pub fn default_source(config: &RelayConfig) -> Arc<dyn ReadingSource> {
    Arc::new(CachedSource::new(SimulatedSource::new(), config.cache_ttl()))
}

/// Bind the configured address and serve until the process exits.
pub async fn start_relay_server(config: RelayConfig, source: Arc<dyn ReadingSource>) -> Result<()> {
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| SentinelError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = TcpListener::bind(&addr).await?;

    info!("Starting Air Sentinel relay on http://{}", addr);
    info!("Feed endpoint: ws://{}/api/v1/ws/air-quality", addr);
    info!("API endpoint: http://{}/api/v1/air-quality", addr);

    serve(listener, RelayState::new(config, source)).await
}

/// Serve the relay on an already bound listener.
pub async fn serve(listener: TcpListener, state: RelayState) -> Result<()> {
    axum::serve(listener, create_app(state))
        .await
        .map_err(|e| SentinelError::web_server_error(format!("Server error: {}", e)))
}
