// =============================================================================
// Order Record — audit entry for every webhook the bridge handles
// =============================================================================
//
// One record per request, whether it ended in an order or was rejected at
// some stage. Rejections name the stage that stopped them and a short
// reason; internal error detail stays in the logs.
// =============================================================================

use serde::Serialize;

use crate::broker::OrderReceipt;
use crate::contract::ResolvedSymbol;
use crate::signal::TradeIntent;

/// Pipeline stage a request was stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Request,
    Auth,
    Parse,
    Resolve,
    Broker,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Request => "request",
            Self::Auth => "auth",
            Self::Parse => "parse",
            Self::Resolve => "resolve",
            Self::Broker => "broker",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Submitted,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    /// UUID v4.
    pub id: String,
    pub outcome: Outcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Alert text as received. Empty when the body had none.
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<TradeIntent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ResolvedSymbol>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<OrderReceipt>,

    pub mock_mode: bool,

    /// RFC 3339.
    pub created_at: String,
}

impl OrderRecord {
    pub fn submitted(
        message: impl Into<String>,
        intent: TradeIntent,
        contract: ResolvedSymbol,
        receipt: OrderReceipt,
        mock_mode: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            outcome: Outcome::Submitted,
            stage: None,
            reason: None,
            message: message.into(),
            intent: Some(intent),
            contract: Some(contract),
            receipt: Some(receipt),
            mock_mode,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn rejected(
        message: impl Into<String>,
        stage: Stage,
        reason: impl Into<String>,
        mock_mode: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            outcome: Outcome::Rejected,
            stage: Some(stage),
            reason: Some(reason.into()),
            message: message.into(),
            intent: None,
            contract: None,
            receipt: None,
            mock_mode,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Attach whatever the pipeline had produced before it stopped.
    pub fn with_progress(
        mut self,
        intent: Option<TradeIntent>,
        contract: Option<ResolvedSymbol>,
    ) -> Self {
        self.intent = intent;
        self.contract = contract;
        self
    }
}
