// =============================================================================
// Mock broker — local fills, no network
// =============================================================================

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{AccountSummary, OrderReceipt, OrderRequest, OrderStatus};

/// Upper bound on remembered simulated orders.
const MAX_SIMULATED_ORDERS: usize = 500;

/// Simulated fills keyed by id, evicted oldest first.
#[derive(Debug, Default)]
struct SimulatedOrders {
    by_id: HashMap<String, OrderReceipt>,
    arrival: VecDeque<String>,
}

impl SimulatedOrders {
    fn insert(&mut self, receipt: OrderReceipt) {
        self.arrival.push_back(receipt.order_id.clone());
        self.by_id.insert(receipt.order_id.clone(), receipt);
        while self.arrival.len() > MAX_SIMULATED_ORDERS {
            if let Some(oldest) = self.arrival.pop_front() {
                self.by_id.remove(&oldest);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MockBroker {
    orders: RwLock<SimulatedOrders>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every order fills immediately.
    pub fn place_order(&self, request: &OrderRequest) -> OrderReceipt {
        let receipt = OrderReceipt {
            order_id: format!("SIM-{}", Uuid::new_v4()),
            symbol: request.symbol.clone(),
            action: request.action,
            quantity: request.quantity,
            status: OrderStatus::Filled,
            message: "simulated fill".to_string(),
            placed_at: Utc::now(),
        };

        info!(
            order_id = %receipt.order_id,
            symbol = %receipt.symbol,
            action = %receipt.action,
            quantity = receipt.quantity,
            "mock order filled"
        );

        self.orders.write().insert(receipt.clone());

        receipt
    }

    /// `None` for ids this broker never issued or has already evicted.
    pub fn order_status(&self, order_id: &str) -> Option<OrderReceipt> {
        self.orders.read().by_id.get(order_id).cloned()
    }

    pub fn account_summary(&self) -> AccountSummary {
        AccountSummary {
            account: "SIM-ACCOUNT".to_string(),
            equity: 0.0,
            available_margin: 0.0,
            positions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;

    #[test]
    fn fills_with_simulated_id() {
        let broker = MockBroker::new();
        let receipt = broker.place_order(&OrderRequest::market("MXFD4", Action::Buy, 3));
        assert!(receipt.order_id.starts_with("SIM-"));
        assert_eq!(receipt.status, OrderStatus::Filled);
        assert_eq!(receipt.symbol, "MXFD4");
        assert_eq!(receipt.quantity, 3);
    }

    #[test]
    fn ids_are_unique() {
        let broker = MockBroker::new();
        let a = broker.place_order(&OrderRequest::market("MXFD4", Action::Buy, 1));
        let b = broker.place_order(&OrderRequest::market("MXFD4", Action::Buy, 1));
        assert_ne!(a.order_id, b.order_id);
    }

    #[test]
    fn unknown_order_is_absent() {
        assert_eq!(MockBroker::new().order_status("SIM-missing"), None);
    }

    #[test]
    fn full_book_evicts_only_the_oldest_fill() {
        let broker = MockBroker::new();
        let first = broker.place_order(&OrderRequest::market("MXFD4", Action::Buy, 1));
        let second = broker.place_order(&OrderRequest::market("MXFD4", Action::Buy, 1));
        for _ in 0..(MAX_SIMULATED_ORDERS - 1) {
            broker.place_order(&OrderRequest::market("TXFD4", Action::Sell, 1));
        }

        assert_eq!(broker.order_status(&first.order_id), None);
        assert_eq!(broker.order_status(&second.order_id), Some(second));
        assert_eq!(broker.orders.read().by_id.len(), MAX_SIMULATED_ORDERS);
    }

    #[test]
    fn account_has_no_positions() {
        let summary = MockBroker::new().account_summary();
        assert_eq!(summary.account, "SIM-ACCOUNT");
        assert!(summary.positions.is_empty());
    }
}
