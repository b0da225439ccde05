// =============================================================================
// Shared types used across the signal bridge
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Trade direction carried by an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Normalise an action token taken from alert text.
    ///
    /// Matching is case-insensitive and accepts the Chinese order verbs as
    /// well as the English buy/sell and long/short aliases.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "買入" | "buy" | "long" => Some(Self::Buy),
            "賣出" | "sell" | "short" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

/// Deployment environment. Selects which `.env_<env>` file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Test,
    Production,
}

impl AppEnv {
    pub fn env_file(self) -> &'static str {
        match self {
            Self::Development => ".env_development",
            Self::Test => ".env_test",
            Self::Production => ".env_production",
        }
    }
}

impl Default for AppEnv {
    fn default() -> Self {
        Self::Development
    }
}

impl FromStr for AppEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            other => anyhow::bail!("unknown environment '{other}'"),
        }
    }
}

impl std::fmt::Display for AppEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// What the parser does with a ticker that is absent from the symbol mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Use the cleaned ticker verbatim as the base symbol.
    Permissive,
    /// Reject the signal.
    Strict,
}

impl Default for UnmappedPolicy {
    fn default() -> Self {
        Self::Permissive
    }
}

impl FromStr for UnmappedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => anyhow::bail!("unknown unmapped-symbol policy '{other}'"),
        }
    }
}

impl std::fmt::Display for UnmappedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permissive => write!(f, "permissive"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Which contract-month encoding the resolver applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Exchange month-letter codes, e.g. `MXFD4`.
    Taifex,
    /// Base code followed by two-digit year and month, e.g. `MXF2404`.
    Generic,
}

impl Default for CodecKind {
    fn default() -> Self {
        Self::Taifex
    }
}

impl FromStr for CodecKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "taifex" => Ok(Self::Taifex),
            "generic" => Ok(Self::Generic),
            other => anyhow::bail!("unknown contract codec '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tokens_normalise_across_languages_and_case() {
        for token in ["買入", "Buy", "BUY", "buy", "long", "LONG"] {
            assert_eq!(Action::from_token(token), Some(Action::Buy), "{token}");
        }
        for token in ["賣出", "sell", "SELL", "short", "Short"] {
            assert_eq!(Action::from_token(token), Some(Action::Sell), "{token}");
        }
    }

    #[test]
    fn unknown_action_token_is_rejected() {
        assert_eq!(Action::from_token("hold"), None);
        assert_eq!(Action::from_token("未知操作"), None);
        assert_eq!(Action::from_token(""), None);
    }

    #[test]
    fn app_env_parses_and_selects_env_file() {
        let env: AppEnv = "Production".parse().unwrap();
        assert_eq!(env, AppEnv::Production);
        assert_eq!(env.env_file(), ".env_production");
        assert!("staging".parse::<AppEnv>().is_err());
        assert_eq!(AppEnv::default(), AppEnv::Development);
    }

    #[test]
    fn policy_and_codec_deserialise_lowercase() {
        let policy: UnmappedPolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(policy, UnmappedPolicy::Strict);
        let codec: CodecKind = serde_json::from_str("\"generic\"").unwrap();
        assert_eq!(codec, CodecKind::Generic);
        assert_eq!(UnmappedPolicy::default(), UnmappedPolicy::Permissive);
    }
}
