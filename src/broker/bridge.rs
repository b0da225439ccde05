// =============================================================================
// Broker bridge client — HMAC-SHA256 signed requests
// =============================================================================
//
// The bridge is a sidecar wrapping the broker's SDK. Each request carries:
//
//   X-BRIDGE-APIKEY     API key
//   X-BRIDGE-TIMESTAMP  UNIX milliseconds
//   X-BRIDGE-SIGNATURE  hex(HMAC-SHA256(secret, timestamp + METHOD + path + body))
//
// The secret is never logged or serialised.
// =============================================================================

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use super::{AccountSummary, OrderReceipt, OrderRequest};
use crate::settings::BrokerSettings;

type HmacSha256 = Hmac<Sha256>;

/// Envelope every bridge response is wrapped in.
#[derive(Debug, Deserialize)]
struct BridgeResult<T> {
    is_success: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Clone)]
pub struct BridgeClient {
    api_key: String,
    secret: String,
    account: String,
    base_url: String,
    client: reqwest::Client,
}

impl BridgeClient {
    pub fn new(settings: &BrokerSettings) -> Result<Self> {
        let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            anyhow::bail!("broker bridge base URL is empty");
        }

        let mut default_headers = HeaderMap::new();
        if !settings.api_key.is_empty() {
            let val = HeaderValue::from_str(&settings.api_key)
                .context("broker API key is not a valid header value")?;
            default_headers.insert("X-BRIDGE-APIKEY", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .context("failed to build broker HTTP client")?;

        debug!(%base_url, "BridgeClient initialised");

        Ok(Self {
            api_key: settings.api_key.clone(),
            secret: settings.api_secret.clone(),
            account: settings.account.clone(),
            base_url,
            client,
        })
    }

    // ── Signing ────────────────────────────────────────────────────────────

    pub fn sign(&self, timestamp: u64, method: &Method, path: &str, body: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .context("invalid HMAC key")?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(method.as_str().as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }

    // ── Transport ──────────────────────────────────────────────────────────

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<T> {
        self.send_optional(method.clone(), path, body)
            .await?
            .with_context(|| format!("broker bridge {method} {path} returned 404"))
    }

    /// Like `send`, but a 404 from the bridge is `Ok(None)`.
    async fn send_optional<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<Option<T>> {
        let body = body.unwrap_or_default();
        let timestamp = Self::timestamp_ms();
        let signature = self.sign(timestamp, &method, path, &body)?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("X-BRIDGE-TIMESTAMP", timestamp.to_string())
            .header("X-BRIDGE-SIGNATURE", signature);
        if !self.account.is_empty() {
            request = request.header("X-BRIDGE-ACCOUNT", &self.account);
        }
        if !body.is_empty() {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("{method} {path} request failed"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("failed to read {method} {path} response"))?;

        if status == StatusCode::NOT_FOUND {
            debug!(%method, path, "broker bridge has no such resource");
            return Ok(None);
        }
        if !status.is_success() {
            warn!(%method, path, %status, "broker bridge returned an error status");
            anyhow::bail!("broker bridge {method} {path} returned {status}: {text}");
        }

        let envelope: BridgeResult<T> = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {method} {path} response"))?;

        if !envelope.is_success {
            anyhow::bail!("broker bridge rejected {method} {path}: {}", envelope.message);
        }

        envelope
            .data
            .map(Some)
            .with_context(|| format!("broker bridge {method} {path} response has no data"))
    }

    // ── Endpoints ──────────────────────────────────────────────────────────

    /// POST /orders
    #[instrument(skip(self, request), fields(symbol = %request.symbol), name = "bridge::place_order")]
    pub async fn place_order(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        let body = serde_json::to_string(request).context("failed to encode order")?;
        let receipt: OrderReceipt = self.send(Method::POST, "/orders", Some(body)).await?;
        debug!(order_id = %receipt.order_id, status = %receipt.status, "order accepted by bridge");
        Ok(receipt)
    }

    /// GET /orders/{id}
    #[instrument(skip(self), name = "bridge::order_status")]
    pub async fn order_status(&self, order_id: &str) -> Result<Option<OrderReceipt>> {
        let path = format!("/orders/{order_id}");
        self.send_optional(Method::GET, &path, None).await
    }

    /// GET /account
    #[instrument(skip(self), name = "bridge::account_summary")]
    pub async fn account_summary(&self) -> Result<AccountSummary> {
        self.send(Method::GET, "/account", None).await
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("account", &self.account)
            .field("base_url", &self.base_url)
            .field("api_key_set", &!self.api_key.is_empty())
            .finish()
    }
}
