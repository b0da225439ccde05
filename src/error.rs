// =============================================================================
// Domain errors — routine, expected failures of the signal pipeline
// =============================================================================
//
// These are returned as values, never raised. Plumbing and startup failures
// use `anyhow` instead.
// =============================================================================

use thiserror::Error;

/// The alert text could not be turned into a trade intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("no signal pattern matched")]
    NoMatch,

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("invalid quantity '{0}'")]
    InvalidQuantity(String),

    #[error("invalid position size '{0}'")]
    InvalidPosition(String),

    #[error("ticker '{0}' is empty after cleanup")]
    EmptyTicker(String),

    #[error("unmapped symbol '{0}'")]
    UnmappedSymbol(String),
}

/// No tradable contract code could be produced for a base symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("base symbol is empty")]
    EmptySymbol,

    #[error("could not resolve a contract code for '{base}'")]
    Unresolvable { base: String },
}
