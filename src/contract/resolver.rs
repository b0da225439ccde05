// =============================================================================
// Contract Resolver — base symbol + date → dated contract code
// =============================================================================
//
// Stateless: every call recomputes the target month from `as_of`, so two
// consecutive orders around expiry can legitimately resolve differently.
//
//   START → third Wednesday → {FRONT_MONTH | NEXT_MONTH} → ENCODE
//         → {RESOLVED | FAILED}
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contract::calendar::{target_month, third_wednesday, ContractMonth, RolloverDecision};
use crate::contract::codec::{exchange_root, ContractCodec, GenericCodec, TaifexCodec};
use crate::error::ResolveError;
use crate::symbol::strip_contract_suffix;

/// Default number of days before expiry at which trading rolls.
pub const DEFAULT_ROLLOVER_WINDOW_DAYS: u32 = 1;

/// A contract code ready for order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSymbol {
    pub base: String,
    pub exchange_root: String,
    pub month: ContractMonth,
    pub decision: RolloverDecision,
    pub expiry: NaiveDate,
    /// The symbol handed to the broker.
    pub code: String,
    /// Which codec produced `code`.
    pub codec: &'static str,
}

pub struct ContractResolver {
    codec: Box<dyn ContractCodec>,
    rollover_window_days: u32,
}

impl ContractResolver {
    pub fn new(codec: Box<dyn ContractCodec>, rollover_window_days: u32) -> Self {
        Self {
            codec,
            rollover_window_days,
        }
    }

    pub fn rollover_window_days(&self) -> u32 {
        self.rollover_window_days
    }

    pub fn resolve(&self, base_symbol: &str, as_of: NaiveDate) -> Result<ResolvedSymbol, ResolveError> {
        let base = strip_contract_suffix(base_symbol);
        if base.trim().is_empty() {
            warn!(base_symbol, "cannot resolve an empty base symbol");
            return Err(ResolveError::EmptySymbol);
        }

        let Some((month, decision)) = target_month(as_of, self.rollover_window_days) else {
            warn!(
                %base,
                %as_of,
                window_days = self.rollover_window_days,
                "rollover window falls outside the calendar"
            );
            return Err(ResolveError::Unresolvable { base });
        };
        let root = exchange_root(&base).to_string();
        debug!(
            %base,
            %root,
            %as_of,
            expiry = %third_wednesday(as_of),
            %decision,
            %month,
            "contract month selected"
        );

        let (code, codec) = match self.codec.encode(&base, &root, month) {
            Some(code) if !code.trim().is_empty() => (code, self.codec.name()),
            _ => {
                warn!(%base, codec = self.codec.name(), "contract encoding unavailable, using generic code");
                let code = GenericCodec.encode(&base, &root, month).unwrap_or_default();
                (code, GenericCodec.name())
            }
        };

        if code.trim().is_empty() {
            warn!(%base, "contract code resolved to an empty string");
            return Err(ResolveError::Unresolvable { base });
        }

        info!(%base, %code, %month, %decision, "contract resolved");
        Ok(ResolvedSymbol {
            base,
            exchange_root: root,
            month,
            decision,
            expiry: third_wednesday(as_of),
            code,
            codec,
        })
    }
}

impl Default for ContractResolver {
    fn default() -> Self {
        Self::new(Box::new(TaifexCodec), DEFAULT_ROLLOVER_WINDOW_DAYS)
    }
}

impl std::fmt::Debug for ContractResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractResolver")
            .field("codec", &self.codec.name())
            .field("rollover_window_days", &self.rollover_window_days)
            .finish()
    }
}

/// Resolve `base_symbol` on `as_of` with the exchange codec.
pub fn resolve_target_symbol(
    base_symbol: &str,
    as_of: NaiveDate,
    rollover_window_days: u32,
) -> Result<ResolvedSymbol, ResolveError> {
    ContractResolver::new(Box::new(TaifexCodec), rollover_window_days).resolve(base_symbol, as_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct NullCodec;

    impl ContractCodec for NullCodec {
        fn name(&self) -> &'static str {
            "null"
        }

        fn encode(&self, _: &str, _: &str, _: ContractMonth) -> Option<String> {
            Some("   ".into())
        }
    }

    #[test]
    fn expiry_day_resolves_to_april() {
        let resolved = resolve_target_symbol("MXF", date(2024, 3, 20), 1).unwrap();
        assert_eq!(resolved.month, ContractMonth { year: 2024, month: 4 });
        assert_eq!(resolved.decision, RolloverDecision::NextMonth);
        assert_eq!(resolved.code, "MXFD4");
        assert_eq!(resolved.exchange_root, "FIMTX");
        assert_eq!(resolved.expiry, date(2024, 3, 20));
    }

    #[test]
    fn front_month_before_window() {
        let resolved = resolve_target_symbol("TXF", date(2024, 3, 18), 1).unwrap();
        assert_eq!(resolved.code, "TXFC4");
        assert_eq!(resolved.decision, RolloverDecision::FrontMonth);
    }

    #[test]
    fn december_rollover_crosses_year() {
        let resolved = resolve_target_symbol("MXF", date(2024, 12, 20), 1).unwrap();
        assert_eq!(resolved.month, ContractMonth { year: 2025, month: 1 });
        assert_eq!(resolved.code, "MXFA5");
    }

    #[test]
    fn continuation_suffixes_are_not_double_encoded() {
        for ticker in ["MXF1!", "MXF01", "MXF1", "MXF"] {
            let resolved = resolve_target_symbol(ticker, date(2024, 3, 5), 1).unwrap();
            assert_eq!(resolved.code, "MXFC4", "{ticker}");
            assert_eq!(resolved.base, "MXF");
        }
    }

    #[test]
    fn empty_symbol_is_a_resolution_failure() {
        assert_eq!(resolve_target_symbol("", date(2024, 3, 5), 1), Err(ResolveError::EmptySymbol));
        assert_eq!(resolve_target_symbol("!!", date(2024, 3, 5), 1), Err(ResolveError::EmptySymbol));
    }

    #[test]
    fn unencodable_symbol_falls_back_to_generic_code() {
        let resolved = resolve_target_symbol("黃金", date(2024, 3, 5), 1).unwrap();
        assert_eq!(resolved.code, "黃金2403");
        assert_eq!(resolved.codec, "generic");
    }

    #[test]
    fn blank_codec_output_falls_back_to_generic_code() {
        let resolver = ContractResolver::new(Box::new(NullCodec), 1);
        let resolved = resolver.resolve("TXF", date(2024, 4, 1)).unwrap();
        assert_eq!(resolved.code, "TXF2404");
        assert_eq!(resolved.codec, "generic");
    }

    #[test]
    fn oversized_window_is_a_resolution_failure() {
        assert_eq!(
            resolve_target_symbol("MXF", date(2024, 3, 5), 4_000_000_000),
            Err(ResolveError::Unresolvable { base: "MXF".into() })
        );
    }

    #[test]
    fn generic_resolver_uses_configured_window() {
        let resolver = ContractResolver::new(Box::new(GenericCodec), 3);
        assert_eq!(resolver.resolve("MXF", date(2024, 3, 17)).unwrap().code, "MXF2404");
        assert_eq!(resolver.resolve("MXF", date(2024, 3, 16)).unwrap().code, "MXF2403");
    }
}
