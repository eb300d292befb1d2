//! # Ripple Server
//!
//! Realtime channel fan-out server.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! ripple
//!
//! # Run with a config file in the search path
//! ripple  # reads ripple.toml, /etc/ripple/ripple.toml, ~/.config/ripple/ripple.toml
//!
//! # Run with environment variables
//! RIPPLE_PORT=8080 RIPPLE_HOST=0.0.0.0 ripple
//! ```

use anyhow::Result;
use ripple_server::{app, config, metrics};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripple=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!("Starting Ripple server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    app::run_server(config).await?;

    Ok(())
}
