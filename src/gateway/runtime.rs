// =============================================================================
// Function runtime loop — polls the runtime API for invocations
// =============================================================================
//
//   GET  /2018-06-01/runtime/invocation/next
//   POST /2018-06-01/runtime/invocation/{id}/response
//   POST /2018-06-01/runtime/invocation/{id}/error
//
// The next-invocation call long-polls, so the client has no request timeout.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use super::event::{handle_event, GatewayEvent};
use crate::app_state::AppState;

/// Set by the function runtime to `host:port` of its API.
pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";

struct RuntimeClient {
    base: String,
    client: reqwest::Client,
}

impl RuntimeClient {
    fn new(api: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build runtime API client")?;
        Ok(Self {
            base: format!("http://{api}/{API_VERSION}/runtime"),
            client,
        })
    }

    /// Returns (request id, raw event body).
    async fn next_invocation(&self) -> Result<(String, String)> {
        let resp = self
            .client
            .get(format!("{}/invocation/next", self.base))
            .send()
            .await
            .context("GET invocation/next failed")?;

        let request_id = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .context("invocation is missing its request id")?;

        let body = resp.text().await.context("failed to read invocation event")?;
        Ok((request_id, body))
    }

    async fn post(&self, path: &str, body: String) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;

        if !resp.status().is_success() {
            anyhow::bail!("runtime API POST {path} returned {}", resp.status());
        }
        Ok(())
    }

    async fn respond(&self, request_id: &str, body: String) -> Result<()> {
        self.post(&format!("/invocation/{request_id}/response"), body).await
    }

    async fn report_error(&self, request_id: &str, message: &str) -> Result<()> {
        let body = json!({
            "errorMessage": message,
            "errorType": "InvocationError",
        });
        self.post(&format!("/invocation/{request_id}/error"), body.to_string())
            .await
    }
}

/// Serve invocations until the runtime API becomes unreachable.
#[instrument(skip(state, api), name = "gateway::run")]
pub async fn run(state: Arc<AppState>, api: &str) -> Result<()> {
    let runtime = RuntimeClient::new(api)?;
    info!("function runtime loop started");

    loop {
        let (request_id, raw) = runtime.next_invocation().await?;

        let event: GatewayEvent = match serde_json::from_str(&raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(%request_id, error = %e, "invocation event is not a gateway event");
                if let Err(e) = runtime.report_error(&request_id, "unrecognised event").await {
                    error!(%request_id, error = %e, "failed to report invocation error");
                }
                continue;
            }
        };

        let response = handle_event(&state, &event).await;
        let body = match serde_json::to_string(&response) {
            Ok(body) => body,
            Err(e) => {
                error!(%request_id, error = %e, "failed to encode gateway response");
                if let Err(e) = runtime.report_error(&request_id, "response encoding failed").await {
                    error!(%request_id, error = %e, "failed to report invocation error");
                }
                continue;
            }
        };

        if let Err(e) = runtime.respond(&request_id, body).await {
            error!(%request_id, error = %e, "failed to post invocation response");
        }
    }
}
