// =============================================================================
// Signal Parser — alert text → TradeIntent
// =============================================================================
//
// Matchers are tried in priority order and the first one that matches wins.
// A matched signal that then fails validation (unknown action, bad number,
// unmapped symbol under the strict policy) is rejected outright; it never
// falls through to a weaker tier.
// =============================================================================

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SignalError;
use crate::signal::matcher::{default_matchers, RawSignal, SignalMatcher};
use crate::symbol::{clean_ticker, strip_contract_suffix, SymbolMapping};
use crate::types::{Action, UnmappedPolicy};

/// Structured trade instruction extracted from an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeIntent {
    pub action: Action,
    /// Canonical base code, or the cleaned ticker when unmapped under the
    /// permissive policy.
    pub base_symbol: String,
    /// Contracts to trade. Always positive.
    pub quantity: u32,
    /// Strategy net position after this order. Informational only.
    pub resulting_position: i64,
    /// Ticker token exactly as matched in the alert.
    pub original_ticker: String,
}

pub struct SignalParser {
    matchers: Vec<Box<dyn SignalMatcher>>,
    mapping: SymbolMapping,
    policy: UnmappedPolicy,
}

impl SignalParser {
    /// Parser with the standard strict → relaxed → permissive tiers.
    pub fn new(mapping: SymbolMapping, policy: UnmappedPolicy) -> Self {
        Self::with_matchers(default_matchers(), mapping, policy)
    }

    pub fn with_matchers(
        matchers: Vec<Box<dyn SignalMatcher>>,
        mapping: SymbolMapping,
        policy: UnmappedPolicy,
    ) -> Self {
        Self {
            matchers,
            mapping,
            policy,
        }
    }

    pub fn policy(&self) -> UnmappedPolicy {
        self.policy
    }

    pub fn mapping(&self) -> &SymbolMapping {
        &self.mapping
    }

    /// Parse an alert into a [`TradeIntent`].
    pub fn parse_signal(&self, text: &str) -> Result<TradeIntent, SignalError> {
        let (tier, raw) = self
            .matchers
            .iter()
            .find_map(|m| m.attempt(text).map(|raw| (m.name(), raw)))
            .ok_or_else(|| {
                warn!(text, "no signal pattern matched");
                SignalError::NoMatch
            })?;

        debug!(
            tier,
            action = %raw.action,
            quantity = %raw.quantity,
            ticker = %raw.ticker,
            position = %raw.position,
            "signal pattern matched"
        );

        let intent = self.validate(raw)?;
        info!(
            tier,
            action = %intent.action,
            base_symbol = %intent.base_symbol,
            quantity = intent.quantity,
            resulting_position = intent.resulting_position,
            "signal parsed"
        );
        Ok(intent)
    }

    fn validate(&self, raw: RawSignal) -> Result<TradeIntent, SignalError> {
        let action = Action::from_token(&raw.action).ok_or_else(|| {
            warn!(action = %raw.action, "unknown action in signal");
            SignalError::UnknownAction(raw.action.clone())
        })?;

        let quantity = raw
            .quantity
            .parse::<u32>()
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| SignalError::InvalidQuantity(raw.quantity.clone()))?;

        let resulting_position = raw
            .position
            .parse::<i64>()
            .map_err(|_| SignalError::InvalidPosition(raw.position.clone()))?;

        let base_symbol = self.map_ticker(&raw.ticker)?;

        Ok(TradeIntent {
            action,
            base_symbol,
            quantity,
            resulting_position,
            original_ticker: raw.ticker,
        })
    }

    /// Exact cleaned ticker, then the suffix-stripped base, then the policy.
    fn map_ticker(&self, ticker: &str) -> Result<String, SignalError> {
        let cleaned = clean_ticker(ticker);
        if cleaned.is_empty() {
            return Err(SignalError::EmptyTicker(ticker.to_string()));
        }

        if let Some(code) = self.mapping.get(&cleaned) {
            return Ok(code.to_string());
        }

        let base = strip_contract_suffix(&cleaned);
        if let Some(code) = self.mapping.get(&base) {
            debug!(ticker = %cleaned, base = %base, code, "mapped via base code");
            return Ok(code.to_string());
        }

        match self.policy {
            UnmappedPolicy::Permissive => {
                info!(ticker = %cleaned, "ticker not in mapping, using it verbatim");
                Ok(cleaned)
            }
            UnmappedPolicy::Strict => {
                warn!(ticker = %cleaned, "ticker not in mapping, rejecting signal");
                Err(SignalError::UnmappedSymbol(cleaned))
            }
        }
    }
}

impl std::fmt::Debug for SignalParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers: Vec<_> = self.matchers.iter().map(|m| m.name()).collect();
        f.debug_struct("SignalParser")
            .field("tiers", &tiers)
            .field("mapping_entries", &self.mapping.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::matcher::StrictMatcher;
    use proptest::prelude::*;

    fn parser() -> SignalParser {
        SignalParser::new(SymbolMapping::default(), UnmappedPolicy::Permissive)
    }

    fn strict_parser() -> SignalParser {
        SignalParser::new(SymbolMapping::default(), UnmappedPolicy::Strict)
    }

    #[test]
    fn parses_product_name_alert() {
        let mapping: SymbolMapping = [("小台指", "MXF")].into_iter().collect();
        let parser = SignalParser::new(mapping, UnmappedPolicy::Strict);
        let intent = parser.parse_signal("訂單買入 @ 1已成交小台指。新策略倉位是1").unwrap();
        assert_eq!(
            intent,
            TradeIntent {
                action: Action::Buy,
                base_symbol: "MXF".into(),
                quantity: 1,
                resulting_position: 1,
                original_ticker: "小台指".into(),
            }
        );
    }

    #[test]
    fn parses_continuation_ticker_with_short_position() {
        let intent = parser()
            .parse_signal("訂單sell @ 1已成交MXF1!。新策略倉位是-1")
            .unwrap();
        assert_eq!(intent.action, Action::Sell);
        assert_eq!(intent.base_symbol, "MXF");
        assert_eq!(intent.quantity, 1);
        assert_eq!(intent.resulting_position, -1);
        assert_eq!(intent.original_ticker, "MXF1!");
    }

    #[test]
    fn parses_full_strategy_prefix() {
        let text = "SuperTrend + QQE 策略 - 波動過濾版 + Zero Lag Trend 過濾 (加倉條件) \
                    (15, 20, 1.3, 8, 8, 3, 15, EMA, close, 20, hl2, 4, 50, 1.5, 7)：\
                    訂單買入 @ 3已成交台指期。新策略倉位是3";
        let intent = parser().parse_signal(text).unwrap();
        assert_eq!(intent.base_symbol, "TXF");
        assert_eq!(intent.quantity, 3);
    }

    #[test]
    fn action_variants_normalise() {
        for (word, expected) in [
            ("買入", Action::Buy),
            ("Buy", Action::Buy),
            ("BUY", Action::Buy),
            ("long", Action::Buy),
            ("賣出", Action::Sell),
            ("sell", Action::Sell),
            ("short", Action::Sell),
        ] {
            let text = format!("訂單{word} @ 1已成交MXF。新策略倉位是0");
            assert_eq!(parser().parse_signal(&text).unwrap().action, expected, "{word}");
        }
    }

    #[test]
    fn unknown_action_is_rejected_even_when_pattern_matches() {
        let err = parser()
            .parse_signal("訂單hold @ 1已成交MXF。新策略倉位是1")
            .unwrap_err();
        assert_eq!(err, SignalError::UnknownAction("hold".into()));
    }

    #[test]
    fn missing_markers_fail() {
        assert_eq!(parser().parse_signal("買入 1 小台指"), Err(SignalError::NoMatch));
        assert_eq!(strict_parser().parse_signal("買入 1 小台指"), Err(SignalError::NoMatch));
        assert_eq!(parser().parse_signal(""), Err(SignalError::NoMatch));
    }

    #[test]
    fn relaxed_tier_accepts_alert_without_order_marker() {
        let intent = parser()
            .parse_signal("快訊：buy @ 2已成交MXF01。新策略倉位是2")
            .unwrap();
        assert_eq!(intent.action, Action::Buy);
        assert_eq!(intent.base_symbol, "MXF");
        assert_eq!(intent.quantity, 2);
    }

    #[test]
    fn permissive_tier_accepts_bare_shape() {
        let intent = parser().parse_signal("long @ 2 MXF -2").unwrap();
        assert_eq!(intent.action, Action::Buy);
        assert_eq!(intent.base_symbol, "MXF");
        assert_eq!(intent.quantity, 2);
        assert_eq!(intent.resulting_position, -2);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = parser()
            .parse_signal("訂單買入 @ 0已成交MXF。新策略倉位是0")
            .unwrap_err();
        assert_eq!(err, SignalError::InvalidQuantity("0".into()));
    }

    #[test]
    fn overflowing_numbers_are_rejected() {
        let err = parser()
            .parse_signal("訂單買入 @ 99999999999已成交MXF。新策略倉位是1")
            .unwrap_err();
        assert!(matches!(err, SignalError::InvalidQuantity(_)));

        let err = parser()
            .parse_signal("訂單買入 @ 1已成交MXF。新策略倉位是-99999999999999999999")
            .unwrap_err();
        assert!(matches!(err, SignalError::InvalidPosition(_)));
    }

    #[test]
    fn unmapped_ticker_follows_policy() {
        let text = "訂單買入 @ 1已成交黃金。新策略倉位是1";
        assert_eq!(parser().parse_signal(text).unwrap().base_symbol, "黃金");
        assert_eq!(
            strict_parser().parse_signal(text),
            Err(SignalError::UnmappedSymbol("黃金".into()))
        );
    }

    #[test]
    fn unmapped_continuation_ticker_passes_through_cleaned() {
        let text = "訂單sell @ 1已成交GC1!。新策略倉位是0";
        assert_eq!(parser().parse_signal(text).unwrap().base_symbol, "GC1");
    }

    #[test]
    fn marker_only_ticker_is_rejected() {
        let err = parser()
            .parse_signal("訂單買入 @ 1已成交!!。新策略倉位是1")
            .unwrap_err();
        assert_eq!(err, SignalError::EmptyTicker("!!".into()));
    }

    #[test]
    fn single_tier_parser_does_not_fall_back() {
        let parser = SignalParser::with_matchers(
            vec![Box::new(StrictMatcher)],
            SymbolMapping::default(),
            UnmappedPolicy::Permissive,
        );
        assert_eq!(parser.parse_signal("long @ 2 MXF -2"), Err(SignalError::NoMatch));
    }

    proptest! {
        #[test]
        fn text_without_markers_never_parses(text in "\\PC{0,64}") {
            prop_assume!(
                !text.contains('@') && !text.contains("訂單") && !text.contains("已成交")
            );
            prop_assert_eq!(parser().parse_signal(&text), Err(SignalError::NoMatch));
        }
    }
}
