// =============================================================================
// Contract codecs — (base, month) → broker contract code
// =============================================================================
//
// The exchange identifies products by their own root codes (FITX for the
// large index future, FIMTX for the mini) and encodes the delivery month as
// a letter A..L plus the last digit of the year:
//
//     FIMTX, 2024-04  →  MXFD4
//
// `GenericCodec` is the deterministic fallback used whenever the exchange
// encoding yields nothing: base code + YY + MM (`MXF2404`).
// =============================================================================

use crate::contract::calendar::ContractMonth;
use crate::types::CodecKind;

/// Exchange root code for a base instrument. Unlisted instruments keep their
/// base code.
pub fn exchange_root(base: &str) -> &str {
    match base.to_ascii_uppercase().as_str() {
        "TXF" => "FITX",
        "MXF" => "FIMTX",
        _ => base,
    }
}

/// Encodes a contract month for submission to the broker.
pub trait ContractCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when this codec cannot encode the instrument.
    fn encode(&self, base: &str, exchange_root: &str, month: ContractMonth) -> Option<String>;
}

pub fn codec_for(kind: CodecKind) -> Box<dyn ContractCodec> {
    match kind {
        CodecKind::Taifex => Box::new(TaifexCodec),
        CodecKind::Generic => Box::new(GenericCodec),
    }
}

/// Offline rendition of the exchange's symbol conversion.
pub struct TaifexCodec;

impl TaifexCodec {
    fn product_code(exchange_root: &str) -> &str {
        match exchange_root {
            "FITX" => "TXF",
            "FIMTX" => "MXF",
            other => other,
        }
    }

    fn month_letter(month: u32) -> Option<char> {
        if (1..=12).contains(&month) {
            char::from_u32(u32::from(b'A') + month - 1)
        } else {
            None
        }
    }
}

impl ContractCodec for TaifexCodec {
    fn name(&self) -> &'static str {
        "taifex"
    }

    fn encode(&self, _base: &str, exchange_root: &str, month: ContractMonth) -> Option<String> {
        let product = Self::product_code(exchange_root);
        if product.is_empty() || !product.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let letter = Self::month_letter(month.month)?;
        let year_digit = month.year.rem_euclid(10);
        Some(format!("{product}{letter}{year_digit}"))
    }
}

pub struct GenericCodec;

impl ContractCodec for GenericCodec {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn encode(&self, base: &str, _exchange_root: &str, month: ContractMonth) -> Option<String> {
        if base.trim().is_empty() || !(1..=12).contains(&month.month) {
            return None;
        }
        Some(format!(
            "{base}{:02}{:02}",
            month.year.rem_euclid(100),
            month.month
        ))
    }
}
