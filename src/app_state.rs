// =============================================================================
// Application State — shared by the HTTP server and the cloud-function runtime
// =============================================================================
//
// Parser, resolver and broker are built once from `Settings` and are
// read-only afterwards. The only mutable state is the audit ring of recent
// order records and the outcome counters.
//
// Thread safety:
//   - Atomic counters for lock-free outcome tracking.
//   - parking_lot::RwLock for the audit ring.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::broker::Broker;
use crate::contract::{codec_for, ContractResolver};
use crate::order_record::{OrderRecord, Outcome};
use crate::settings::Settings;
use crate::signal::SignalParser;

/// Maximum number of order records to retain.
const MAX_RECENT_ORDERS: usize = 100;

pub struct AppState {
    pub settings: Settings,

    // ── Pipeline ────────────────────────────────────────────────────────
    pub parser: SignalParser,
    pub resolver: ContractResolver,
    pub broker: Broker,

    // ── Counters ────────────────────────────────────────────────────────
    pub webhooks_received: AtomicU64,
    pub orders_submitted: AtomicU64,
    pub orders_rejected: AtomicU64,

    // ── Audit Trail ─────────────────────────────────────────────────────
    pub recent_orders: RwLock<Vec<OrderRecord>>,

    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build the pipeline from `settings`. The broker mode follows
    /// `settings.enable_mock`.
    pub fn new(settings: Settings) -> Result<Self> {
        let broker = Broker::from_settings(&settings)?;
        Ok(Self::with_broker(settings, broker))
    }

    pub fn with_broker(settings: Settings, broker: Broker) -> Self {
        let parser = SignalParser::new(settings.symbol_mapping.clone(), settings.unmapped_policy);
        let resolver = ContractResolver::new(
            codec_for(settings.contract_codec),
            settings.rollover_window_days,
        );

        Self {
            settings,
            parser,
            resolver,
            broker,
            webhooks_received: AtomicU64::new(0),
            orders_submitted: AtomicU64::new(0),
            orders_rejected: AtomicU64::new(0),
            recent_orders: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn mock_mode(&self) -> bool {
        self.broker.is_mock()
    }

    // ── Audit ───────────────────────────────────────────────────────────

    /// Record a pipeline outcome. The ring is capped at
    /// [`MAX_RECENT_ORDERS`]; oldest entries are evicted first.
    pub fn push_record(&self, record: OrderRecord) {
        match record.outcome {
            Outcome::Submitted => self.orders_submitted.fetch_add(1, Ordering::Relaxed),
            Outcome::Rejected => self.orders_rejected.fetch_add(1, Ordering::Relaxed),
        };

        let mut orders = self.recent_orders.write();
        orders.push(record);
        while orders.len() > MAX_RECENT_ORDERS {
            orders.remove(0);
        }
    }

    /// Most recent first.
    pub fn recent_orders(&self) -> Vec<OrderRecord> {
        self.recent_orders.read().iter().rev().cloned().collect()
    }

    pub fn counters(&self) -> Counters {
        Counters {
            webhooks_received: self.webhooks_received.load(Ordering::Relaxed),
            orders_submitted: self.orders_submitted.load(Ordering::Relaxed),
            orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
        }
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            environment: self.settings.app_env.to_string(),
            mock_mode: self.mock_mode(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            counters: self.counters(),
            server_time: Utc::now().to_rfc3339(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.settings)
            .field("parser", &self.parser)
            .field("resolver", &self.resolver)
            .field("broker", &self.broker)
            .field("counters", &self.counters())
            .finish()
    }
}

// ── Serialisable views ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub webhooks_received: u64,
    pub orders_submitted: u64,
    pub orders_rejected: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub mock_mode: bool,
    pub uptime_secs: u64,
    pub counters: Counters,
    pub server_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_record::Stage;

    fn state() -> AppState {
        AppState::new(Settings::default()).unwrap()
    }

    #[test]
    fn defaults_to_mock_broker() {
        assert!(state().mock_mode());
    }

    #[test]
    fn audit_ring_is_bounded_and_newest_first() {
        let state = state();
        for i in 0..(MAX_RECENT_ORDERS + 5) {
            state.push_record(OrderRecord::rejected(format!("msg {i}"), Stage::Parse, "x", true));
        }

        let orders = state.recent_orders();
        assert_eq!(orders.len(), MAX_RECENT_ORDERS);
        assert_eq!(orders[0].message, format!("msg {}", MAX_RECENT_ORDERS + 4));
        assert_eq!(state.counters().orders_rejected, (MAX_RECENT_ORDERS + 5) as u64);
    }

    #[test]
    fn health_reports_environment_and_mode() {
        let health = state().health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.environment, "development");
        assert!(health.mock_mode);
        assert_eq!(health.counters.webhooks_received, 0);
    }
}
