// =============================================================================
// Futures Signal Bridge — Main Entry Point
// =============================================================================
//
// Runs either as a long-lived HTTP service or, when started by a function
// runtime, as the invocation loop behind an API gateway. Both share one
// AppState and one pipeline.
//
// Orders are simulated unless ENABLE_MOCK is explicitly turned off.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod broker;
mod contract;
mod error;
mod gateway;
mod order_record;
mod settings;
mod signal;
mod symbol;
mod types;
mod webhook;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::settings::Settings;

const DEFAULT_CONFIG_PATH: &str = "bridge_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let cli_env = std::env::args().nth(1);
    let env = settings::select_environment(cli_env.as_deref());

    let config_path =
        std::env::var("BRIDGE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config_exists = Path::new(&config_path).exists();
    let mut settings = if config_exists {
        Settings::load(&config_path)?
    } else {
        Settings::default()
    };
    settings.app_env = env;
    settings.apply_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    if !config_exists {
        warn!(path = %config_path, "settings file not found, using defaults");
    }
    settings.validate().context("invalid configuration")?;

    info!(
        environment = %settings.app_env,
        mock_mode = settings.enable_mock,
        unmapped_policy = %settings.unmapped_policy,
        rollover_window_days = settings.rollover_window_days,
        mapping_entries = settings.symbol_mapping.len(),
        "Futures Signal Bridge starting"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let bind_addr = settings.bind_addr.clone();
    let state = Arc::new(AppState::new(settings)?);

    // ── 3. Function runtime ──────────────────────────────────────────────
    if let Ok(api) = std::env::var(gateway::RUNTIME_API_ENV) {
        info!(%api, "function runtime detected, serving invocations");
        return gateway::run(state, &api).await;
    }

    // ── 4. HTTP server ───────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await
        .context("API server failed")?;

    info!("Futures Signal Bridge stopped");
    Ok(())
}
