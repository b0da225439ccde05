// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Public: health and the webhook receivers (the pipeline checks the webhook
// secret itself). Everything under `/api/v1/` requires the admin Bearer
// token via the `AuthBearer` extractor.
// =============================================================================

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::webhook::process_alert;

/// Build the full router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .route("/webhook/tradingview", post(webhook))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/orders", get(recent_orders))
        .route("/api/v1/orders/:id", get(order_status))
        .route("/api/v1/contract/:base", get(contract_preview))
        .route("/api/v1/account", get(account))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health())
}

async fn webhook(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let outcome = process_alert(&state, &body).await;
    (outcome.status, Json(outcome.body))
}

async fn recent_orders(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_orders())
}

/// Broker-side status of a single order.
async fn order_status(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> impl IntoResponse {
    match state.broker.order_status(&order_id).await {
        Ok(Some(receipt)) => (StatusCode::OK, Json(json!(receipt))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "status": "error",
                "stage": "broker",
                "message": "unknown order",
            })),
        ),
        Err(e) => {
            warn!(error = %e, %order_id, "order status query failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "status": "error",
                    "stage": "broker",
                    "message": "order status query failed",
                })),
            )
        }
    }
}

/// The contract an order for `base` would target today.
async fn contract_preview(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(base): Path<String>,
) -> impl IntoResponse {
    let as_of = state.settings.exchange_today();
    match state.resolver.resolve(&base, as_of) {
        Ok(resolved) => (StatusCode::OK, Json(json!(resolved))),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "status": "error",
                "stage": "resolve",
                "message": e.to_string(),
            })),
        ),
    }
}

async fn account(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.broker.account_summary().await {
        Ok(summary) => (StatusCode::OK, Json(json!(summary))),
        Err(e) => {
            warn!(error = %e, "account query failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "status": "error",
                    "stage": "broker",
                    "message": "account query failed",
                })),
            )
        }
    }
}
