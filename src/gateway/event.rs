// =============================================================================
// API-gateway proxy events
// =============================================================================
//
// Both payload versions are accepted:
//   REST API (v1)  `httpMethod`, `path`
//   HTTP API (v2)  `requestContext.http.method`, `rawPath`
//
// Routing is by path suffix/substring, so stage prefixes such as
// `/prod/webhook` still reach the pipeline. Bodies flagged
// `isBase64Encoded` are decoded before they reach it.
// =============================================================================

use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::webhook::process_alert;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub raw_path: Option<String>,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub http: Option<HttpContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpContext {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl GatewayEvent {
    pub fn method(&self) -> &str {
        self.http_method
            .as_deref()
            .or_else(|| {
                self.request_context
                    .as_ref()
                    .and_then(|c| c.http.as_ref())
                    .and_then(|h| h.method.as_deref())
            })
            .unwrap_or("GET")
    }

    pub fn path(&self) -> &str {
        self.path
            .as_deref()
            .or(self.raw_path.as_deref())
            .or_else(|| {
                self.request_context
                    .as_ref()
                    .and_then(|c| c.http.as_ref())
                    .and_then(|h| h.path.as_deref())
            })
            .unwrap_or("/")
    }

    /// Request body as text, decoded from base64 when the gateway flagged it.
    pub fn decoded_body(&self) -> Result<String> {
        let body = self.body.as_deref().unwrap_or_default();
        if !self.is_base64_encoded {
            return Ok(body.to_string());
        }
        let bytes = STANDARD
            .decode(body.trim())
            .context("body is not valid base64")?;
        String::from_utf8(bytes).context("decoded body is not valid UTF-8")
    }
}

/// Proxy-integration response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl GatewayResponse {
    pub fn json(status: StatusCode, body: &Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code: status.as_u16(),
            headers,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Webhook,
    NotFound,
}

pub fn route(path: &str) -> Route {
    let path = path.trim_end_matches('/');
    if path.ends_with("/health") {
        Route::Health
    } else if path.contains("/webhook") || path.contains("/tradingview") {
        Route::Webhook
    } else {
        Route::NotFound
    }
}

/// Handle one invocation.
pub async fn handle_event(state: &AppState, event: &GatewayEvent) -> GatewayResponse {
    let path = event.path();
    info!(method = event.method(), path, "gateway invocation");

    match route(path) {
        Route::Health => GatewayResponse::json(StatusCode::OK, &json!(state.health())),
        Route::Webhook => {
            let body = match event.decoded_body() {
                Ok(body) => body,
                Err(e) => {
                    warn!(path, error = %e, "undecodable gateway body");
                    return GatewayResponse::json(
                        StatusCode::BAD_REQUEST,
                        &json!({
                            "status": "error",
                            "stage": "request",
                            "message": "request body could not be decoded",
                        }),
                    );
                }
            };
            let outcome = process_alert(state, body.as_bytes()).await;
            GatewayResponse::json(outcome.status, &outcome.body)
        }
        Route::NotFound => {
            warn!(path, "no gateway route");
            GatewayResponse::json(
                StatusCode::NOT_FOUND,
                &json!({ "status": "error", "message": "not found" }),
            )
        }
    }
}
