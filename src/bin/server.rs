//! ossa-bridge HTTP server binary.
//!
//! # Environment Variables
//!
//! - `OSSA_BRIDGE_CONFIG`: YAML configuration file (optional)
//! - `OSSA_BRIDGE_BIND`: listen address (default: `0.0.0.0:8080`)
//! - `OSSA_BRIDGE_TIMEOUT_MS`: default capability execution timeout
//! - `OSSA_BRIDGE_PREFIX`: registry namespace prefix
//! - `RUST_LOG`: tracing filter (default: `info,ossa_bridge=debug`)
//!
//! # Usage
//!
//! ```bash
//! OSSA_BRIDGE_BIND=127.0.0.1:9090 cargo run --bin ossa-bridge-server
//! ```

use anyhow::Context;
use ossa_bridge::config::BridgeConfig;
use ossa_bridge::server::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ossa_bridge=debug".into()),
        )
        .init();

    let config = BridgeConfig::load().context("loading configuration")?;
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(config);
    tracing::info!(
        "Discovery scanners: {}",
        state.engine.scanner_names().join(", ")
    );

    let app = app_router(state);

    tracing::info!("ossa-bridge {} starting on {}", ossa_bridge::VERSION, bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                          liveness probe");
    tracing::info!("  POST /discover                        scan a project tree");
    tracing::info!("  GET  /agents                          query registered agents");
    tracing::info!("  POST /agents/:id/execute              run a capability");
    tracing::info!("  GET  /agents/:id/translate/:framework  framework descriptor");
    tracing::info!("  GET  /servers, POST /servers          protocol server records");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
