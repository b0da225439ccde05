// =============================================================================
// Broker — order placement in mock or live (bridge) mode
// =============================================================================
//
// The pipeline only ever talks to `Broker`. In mock mode nothing leaves the
// process: orders are filled locally with a `SIM-` id. In live mode orders go
// to the broker bridge over signed HTTP.
// =============================================================================

pub mod bridge;
pub mod mock;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::settings::Settings;
use crate::types::Action;

pub use bridge::BridgeClient;
pub use mock::MockBroker;

// ── Order types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceType {
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Immediate-or-cancel.
    Ioc,
}

/// Open/close instruction. `Auto` lets the broker decide from the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub action: Action,
    pub quantity: u32,
    pub price_type: PriceType,
    pub time_in_force: TimeInForce,
    pub order_type: OrderType,
    pub user_def: String,
}

impl OrderRequest {
    /// Market IOC order with automatic open/close.
    pub fn market(symbol: impl Into<String>, action: Action, quantity: u32) -> Self {
        Self {
            symbol: symbol.into(),
            action,
            quantity,
            price_type: PriceType::Market,
            time_in_force: TimeInForce::Ioc,
            order_type: OrderType::Auto,
            user_def: "API_Order".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Filled,
    Failed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "placed"),
            Self::Filled => write!(f, "filled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub symbol: String,
    pub action: Action,
    pub quantity: u32,
    pub status: OrderStatus,
    #[serde(default)]
    pub message: String,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub symbol: String,
    /// Signed net quantity; negative is short.
    pub quantity: i64,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account: String,
    #[serde(default)]
    pub equity: f64,
    #[serde(default)]
    pub available_margin: f64,
    #[serde(default)]
    pub positions: Vec<PositionInfo>,
}

// ── Dispatch ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Broker {
    Mock(MockBroker),
    Bridge(BridgeClient),
}

impl Broker {
    /// Mock when `enable_mock` is set, otherwise the HTTP bridge.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.enable_mock {
            info!("broker running in mock mode, orders will be simulated");
            Ok(Self::Mock(MockBroker::new()))
        } else {
            let client = BridgeClient::new(&settings.broker)?;
            info!(base_url = %settings.broker.base_url, "broker running in live mode");
            Ok(Self::Bridge(client))
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock(_))
    }

    pub async fn place_order(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        match self {
            Self::Mock(mock) => Ok(mock.place_order(request)),
            Self::Bridge(client) => client.place_order(request).await,
        }
    }

    /// `Ok(None)` when the broker does not know `order_id`.
    pub async fn order_status(&self, order_id: &str) -> Result<Option<OrderReceipt>> {
        match self {
            Self::Mock(mock) => Ok(mock.order_status(order_id)),
            Self::Bridge(client) => client.order_status(order_id).await,
        }
    }

    pub async fn account_summary(&self) -> Result<AccountSummary> {
        match self {
            Self::Mock(mock) => Ok(mock.account_summary()),
            Self::Bridge(client) => client.account_summary().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_order_defaults() {
        let req = OrderRequest::market("MXFD4", Action::Buy, 2);
        assert_eq!(req.price_type, PriceType::Market);
        assert_eq!(req.time_in_force, TimeInForce::Ioc);
        assert_eq!(req.order_type, OrderType::Auto);
        assert_eq!(req.user_def, "API_Order");

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["price_type"], "MARKET");
        assert_eq!(json["time_in_force"], "IOC");
        assert_eq!(json["order_type"], "auto");
    }

    #[test]
    fn from_settings_selects_mode() {
        let mut settings = Settings::default();
        assert!(Broker::from_settings(&settings).unwrap().is_mock());

        settings.enable_mock = false;
        settings.broker.base_url = "http://127.0.0.1:9000".into();
        assert!(!Broker::from_settings(&settings).unwrap().is_mock());
    }

    #[tokio::test]
    async fn mock_dispatch_fills_orders() {
        let broker = Broker::Mock(MockBroker::new());
        let receipt = broker
            .place_order(&OrderRequest::market("TXFD4", Action::Sell, 1))
            .await
            .unwrap();
        assert_eq!(receipt.status, OrderStatus::Filled);

        let looked_up = broker.order_status(&receipt.order_id).await.unwrap();
        assert_eq!(looked_up, Some(receipt));
    }
}
