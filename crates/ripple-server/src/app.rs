//! Application state and server assembly.

use crate::config::Config;
use crate::directory::ChannelDirectory;
use crate::{api, metrics, ws};
use anyhow::Result;
use axum::{
    response::IntoResponse,
    routing::get,
    Router,
};
use ripple_core::{Hub, HubConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared server state.
pub struct AppState {
    /// The fan-out hub.
    pub hub: Hub,
    /// The channel directory backing the REST API.
    pub directory: ChannelDirectory,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let hub_config = HubConfig {
            mailbox_capacity: config.limits.mailbox_capacity,
        };

        Self {
            hub: Hub::with_config(hub_config),
            directory: ChannelDirectory::new(),
            config,
        }
    }
}

/// Build the axum router for the given state.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let ws_path = state.config.websocket.path.clone();

    Router::new()
        .route(&ws_path, get(ws::ws_handler))
        .route(
            "/api/channels",
            get(api::list_channels).post(api::create_channel),
        )
        .route("/api/channels/:id", get(api::get_channel))
        .route(
            "/api/channels/:id/messages",
            get(api::list_messages).post(api::create_message),
        )
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let app = router(state);

    // Bind and serve
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Ripple server listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}?channel=<id>",
        addr, config.websocket.path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
