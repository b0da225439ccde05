pub mod matcher;
pub mod parser;

pub use parser::{SignalParser, TradeIntent};
