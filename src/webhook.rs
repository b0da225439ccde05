// =============================================================================
// Webhook pipeline — alert payload → parsed intent → contract → order
// =============================================================================
//
// Shared by the HTTP server and the cloud-function runtime. Each stage either
// hands its result to the next or stops the request with a status code:
//
//   request  400   body is not a JSON object with a non-empty `message`
//   auth     403   configured webhook secret missing or wrong
//   parse    400   no tier produced a valid TradeIntent
//   resolve  422   no contract code for the base symbol
//   broker   502   order placement errored or was reported failed
//
// Every request leaves one OrderRecord in the audit ring.
// =============================================================================

use axum::http::StatusCode;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, warn};

use crate::api::auth::constant_time_eq;
use crate::app_state::AppState;
use crate::broker::{OrderRequest, OrderStatus};
use crate::order_record::{OrderRecord, Stage};

/// HTTP status plus JSON body, independent of the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookOutcome {
    pub status: StatusCode,
    pub body: Value,
}

impl WebhookOutcome {
    fn rejected(status: StatusCode, stage: Stage, message: &str) -> Self {
        Self {
            status,
            body: json!({
                "status": "error",
                "stage": stage,
                "message": message,
            }),
        }
    }
}

/// Run the pipeline with today's date at the exchange.
pub async fn process_alert(state: &AppState, body: &[u8]) -> WebhookOutcome {
    let as_of = state.settings.exchange_today();
    process_alert_on(state, body, as_of).await
}

/// Run the pipeline resolving contracts as of `as_of`.
pub async fn process_alert_on(state: &AppState, body: &[u8], as_of: NaiveDate) -> WebhookOutcome {
    state.webhooks_received.fetch_add(1, Ordering::Relaxed);
    let mock_mode = state.mock_mode();

    // ── 1. Request shape ────────────────────────────────────────────────
    let payload: Value = match serde_json::from_slice(body) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) | Err(_) => {
            warn!(bytes = body.len(), "webhook body is not a JSON object");
            return reject(state, "", StatusCode::BAD_REQUEST, Stage::Request, "invalid JSON payload");
        }
    };

    let message = match payload.get("message").and_then(Value::as_str) {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => {
            warn!("webhook payload has no usable 'message' field");
            return reject(
                state,
                "",
                StatusCode::BAD_REQUEST,
                Stage::Request,
                "payload must carry a non-empty 'message' field",
            );
        }
    };

    // ── 2. Shared secret ────────────────────────────────────────────────
    let expected = &state.settings.webhook_secret;
    if !expected.is_empty() {
        let presented = payload.get("secret").and_then(Value::as_str).unwrap_or_default();
        if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            warn!("webhook secret missing or invalid");
            return reject(state, &message, StatusCode::FORBIDDEN, Stage::Auth, "invalid webhook secret");
        }
    }

    info!(%message, "alert received");

    // ── 3. Parse ────────────────────────────────────────────────────────
    let intent = match state.parser.parse_signal(&message) {
        Ok(intent) => intent,
        Err(e) => {
            warn!(error = %e, %message, "signal rejected");
            return reject(state, &message, StatusCode::BAD_REQUEST, Stage::Parse, "could not parse signal");
        }
    };

    // ── 4. Resolve ──────────────────────────────────────────────────────
    let contract = match state.resolver.resolve(&intent.base_symbol, as_of) {
        Ok(contract) => contract,
        Err(e) => {
            warn!(error = %e, base_symbol = %intent.base_symbol, "contract resolution failed");
            let outcome = WebhookOutcome::rejected(
                StatusCode::UNPROCESSABLE_ENTITY,
                Stage::Resolve,
                "could not resolve contract",
            );
            state.push_record(
                OrderRecord::rejected(&message, Stage::Resolve, e.to_string(), mock_mode)
                    .with_progress(Some(intent), None),
            );
            return outcome;
        }
    };

    debug!(
        base_symbol = %intent.base_symbol,
        code = %contract.code,
        decision = %contract.decision,
        "order target resolved"
    );

    // ── 5. Place order ──────────────────────────────────────────────────
    let request = OrderRequest::market(&contract.code, intent.action, intent.quantity);
    let receipt = match state.broker.place_order(&request).await {
        Ok(receipt) if receipt.status != OrderStatus::Failed => receipt,
        Ok(receipt) => {
            warn!(order_id = %receipt.order_id, reason = %receipt.message, "broker reported order failure");
            state.push_record(
                OrderRecord::rejected(&message, Stage::Broker, receipt.message.clone(), mock_mode)
                    .with_progress(Some(intent), Some(contract)),
            );
            return WebhookOutcome::rejected(StatusCode::BAD_GATEWAY, Stage::Broker, "order placement failed");
        }
        Err(e) => {
            error!(error = %e, symbol = %request.symbol, "order placement failed");
            state.push_record(
                OrderRecord::rejected(&message, Stage::Broker, "broker error", mock_mode)
                    .with_progress(Some(intent), Some(contract)),
            );
            return WebhookOutcome::rejected(StatusCode::BAD_GATEWAY, Stage::Broker, "order placement failed");
        }
    };

    info!(
        order_id = %receipt.order_id,
        symbol = %receipt.symbol,
        action = %receipt.action,
        quantity = receipt.quantity,
        mock_mode,
        "order submitted"
    );

    let body = json!({
        "status": "success",
        "message": "order submitted",
        "received": message,
        "mock_mode": mock_mode,
        "data": receipt,
        "intent": intent,
        "contract": contract,
    });

    state.push_record(OrderRecord::submitted(&message, intent, contract, receipt, mock_mode));

    WebhookOutcome {
        status: StatusCode::OK,
        body,
    }
}

fn reject(
    state: &AppState,
    message: &str,
    status: StatusCode,
    stage: Stage,
    reason: &str,
) -> WebhookOutcome {
    state.push_record(OrderRecord::rejected(message, stage, reason, state.mock_mode()));
    WebhookOutcome::rejected(status, stage, reason)
}
