// =============================================================================
// Symbol helpers — ticker cleanup and the name → base-code mapping table
// =============================================================================
//
// Alert tickers arrive as product names ("小台指"), bare codes ("MXF") or
// continuation tickers ("MXF1!", "MXF01"). Both the parser and the contract
// resolver reduce them with the same stripping rule so that a continuation
// ticker never ends up double-suffixed.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Remove every non-alphanumeric character (notably the trailing `!` of
/// continuation tickers).
pub fn clean_ticker(ticker: &str) -> String {
    ticker.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Clean the ticker, then drop a trailing run of digits when it follows a
/// purely alphabetic root: `MXF1!` → `MXF`, `MXF01` → `MXF`.
///
/// Tickers without that shape (`2330`, `A1B2`, `小台指`) are only cleaned.
/// The function is idempotent.
pub fn strip_contract_suffix(ticker: &str) -> String {
    let cleaned = clean_ticker(ticker);
    let root = cleaned.trim_end_matches(|c: char| c.is_ascii_digit());

    if root.len() < cleaned.len() && !root.is_empty() && root.chars().all(char::is_alphabetic) {
        root.to_string()
    } else {
        cleaned
    }
}

/// Exact-match table from human-readable product names (and raw codes) to a
/// canonical base instrument code. Read-only once the process has started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolMapping(BTreeMap<String, String>);

impl SymbolMapping {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for SymbolMapping {
    fn default() -> Self {
        let entries = [
            ("小台指", "MXF"),
            ("台指期", "TXF"),
            ("那斯達克100", "NQF"),
            ("MXF", "MXF"),
            ("TXF", "TXF"),
            ("ZME", "ZME"),
            ("ZNQ", "ZNQ"),
            ("ZES", "ZES"),
        ];
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SymbolMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clean_ticker_drops_markers() {
        assert_eq!(clean_ticker("MXF1!"), "MXF1");
        assert_eq!(clean_ticker("小台指"), "小台指");
        assert_eq!(clean_ticker("!!"), "");
    }

    #[test]
    fn strips_continuation_suffixes() {
        assert_eq!(strip_contract_suffix("MXF1"), "MXF");
        assert_eq!(strip_contract_suffix("MXF01"), "MXF");
        assert_eq!(strip_contract_suffix("MXF1!"), "MXF");
        assert_eq!(strip_contract_suffix("MXF"), "MXF");
    }

    #[test]
    fn leaves_non_continuation_tickers_alone() {
        assert_eq!(strip_contract_suffix("2330"), "2330");
        assert_eq!(strip_contract_suffix("A1B2"), "A1B2");
        assert_eq!(strip_contract_suffix("小台指"), "小台指");
    }

    #[test]
    fn default_mapping_covers_products_and_identity_codes() {
        let mapping = SymbolMapping::default();
        assert_eq!(mapping.get("小台指"), Some("MXF"));
        assert_eq!(mapping.get("台指期"), Some("TXF"));
        assert_eq!(mapping.get("MXF"), Some("MXF"));
        assert_eq!(mapping.get("黃金"), None);
    }

    #[test]
    fn mapping_deserialises_from_plain_object() {
        let mapping: SymbolMapping = serde_json::from_str(r#"{"小台指": "MXF"}"#).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("小台指"), Some("MXF"));
    }

    proptest! {
        #[test]
        fn suffix_stripping_is_idempotent(ticker in "[A-Z]{0,4}[0-9]{0,3}!?") {
            let once = strip_contract_suffix(&ticker);
            prop_assert_eq!(strip_contract_suffix(&once), once);
        }

        #[test]
        fn suffix_stripping_is_idempotent_for_any_text(ticker in "\\PC{0,12}") {
            let once = strip_contract_suffix(&ticker);
            prop_assert_eq!(strip_contract_suffix(&once), once);
        }
    }
}
