pub mod calendar;
pub mod codec;
pub mod resolver;

pub use calendar::{ContractMonth, RolloverDecision};
pub use codec::{codec_for, ContractCodec};
pub use resolver::{resolve_target_symbol, ContractResolver, ResolvedSymbol};
