// =============================================================================
// Settings — bridge configuration from JSON file + environment overrides
// =============================================================================
//
// Load order:
//   1. Environment selection (APP_ENV / CLI argument). Cloud-function runs are
//      always `production` and never read `.env_*` files.
//   2. Optional JSON file. All fields carry `#[serde(default)]` so a partial
//      or missing file still yields a complete configuration.
//   3. Environment variable overrides.
//   4. `validate()` — malformed configuration is a fatal startup error.
//
// Secrets (webhook secret, admin token, broker API secret) are never
// serialised and are redacted from `Debug` output.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::contract::resolver::DEFAULT_ROLLOVER_WINDOW_DAYS;
use crate::symbol::SymbolMapping;
use crate::types::{AppEnv, CodecKind, UnmappedPolicy};

/// Longer windows would roll before the previous expiry.
const MAX_ROLLOVER_WINDOW_DAYS: u32 = 31;

// =============================================================================
// Default-value helpers
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rollover_window_days() -> u32 {
    DEFAULT_ROLLOVER_WINDOW_DAYS
}

fn default_exchange_utc_offset_hours() -> i32 {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Parse the loose boolean spellings accepted in env files.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

// =============================================================================
// BrokerSettings
// =============================================================================

/// Connection settings for the HTTP broker bridge used in live mode.
#[derive(Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Base URL of the broker bridge, e.g. `http://127.0.0.1:9000`.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default, skip_serializing)]
    pub api_secret: String,

    /// Trading account the bridge should route orders to.
    #[serde(default)]
    pub account: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            account: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for BrokerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("account", &self.account)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

// =============================================================================
// Settings
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app_env: AppEnv,

    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Fallback log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Simulate fills locally instead of calling the broker bridge.
    #[serde(default = "default_true")]
    pub enable_mock: bool,

    /// Product name → base code. Replaces the built-in table when present.
    #[serde(default)]
    pub symbol_mapping: SymbolMapping,

    #[serde(default)]
    pub unmapped_policy: UnmappedPolicy,

    /// Days before the third Wednesday at which trading rolls to the next
    /// contract month.
    #[serde(default = "default_rollover_window_days")]
    pub rollover_window_days: u32,

    #[serde(default)]
    pub contract_codec: CodecKind,

    /// The exchange's UTC offset; "today" for rollover is taken there.
    #[serde(default = "default_exchange_utc_offset_hours")]
    pub exchange_utc_offset_hours: i32,

    /// When non-empty, webhook payloads must carry this value in `secret`.
    #[serde(default, skip_serializing)]
    pub webhook_secret: String,

    /// Bearer token for the admin API. Admin routes reject everything when
    /// this is empty.
    #[serde(default, skip_serializing)]
    pub admin_token: String,

    #[serde(default)]
    pub broker: BrokerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_env: AppEnv::default(),
            bind_addr: default_bind_addr(),
            log_level: default_log_level(),
            enable_mock: true,
            symbol_mapping: SymbolMapping::default(),
            unmapped_policy: UnmappedPolicy::default(),
            rollover_window_days: default_rollover_window_days(),
            contract_codec: CodecKind::default(),
            exchange_utc_offset_hours: default_exchange_utc_offset_hours(),
            webhook_secret: String::new(),
            admin_token: String::new(),
            broker: BrokerSettings::default(),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("app_env", &self.app_env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("enable_mock", &self.enable_mock)
            .field("symbol_mapping", &self.symbol_mapping)
            .field("unmapped_policy", &self.unmapped_policy)
            .field("rollover_window_days", &self.rollover_window_days)
            .field("contract_codec", &self.contract_codec)
            .field("exchange_utc_offset_hours", &self.exchange_utc_offset_hours)
            .field("webhook_secret_set", &!self.webhook_secret.is_empty())
            .field("admin_token_set", &!self.admin_token.is_empty())
            .field("broker", &self.broker)
            .finish()
    }
}

impl Settings {
    /// Load settings from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse settings from {}", path.display()))?;

        info!(
            path = %path.display(),
            mapping_entries = settings.symbol_mapping.len(),
            "settings file loaded"
        );

        Ok(settings)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (an environment-like key → value source).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("APP_ENV") {
            self.app_env = v.parse()?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v.trim().to_lowercase();
        }
        if let Some(v) = get("ENABLE_MOCK") {
            self.enable_mock = parse_bool(&v);
        }

        if let Some(v) = get("BRIDGE_BIND_ADDR") {
            self.bind_addr = v.trim().to_string();
        } else if get("HOST").is_some() || get("PORT").is_some() {
            let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
            let port: u16 = match get("PORT") {
                Some(p) => p
                    .trim()
                    .parse()
                    .with_context(|| format!("PORT is not a valid port: '{p}'"))?,
                None => 8000,
            };
            self.bind_addr = format!("{}:{}", host.trim(), port);
        }

        if let Some(v) = get("UNMAPPED_POLICY") {
            self.unmapped_policy = v.parse()?;
        }
        if let Some(v) = get("ROLLOVER_WINDOW_DAYS") {
            self.rollover_window_days = v
                .trim()
                .parse()
                .with_context(|| format!("ROLLOVER_WINDOW_DAYS is not a day count: '{v}'"))?;
        }
        if let Some(v) = get("CONTRACT_CODEC") {
            self.contract_codec = v.parse()?;
        }
        if let Some(v) = get("EXCHANGE_UTC_OFFSET_HOURS") {
            self.exchange_utc_offset_hours = v
                .trim()
                .parse()
                .with_context(|| format!("EXCHANGE_UTC_OFFSET_HOURS is not an integer: '{v}'"))?;
        }

        if let Some(v) = get("WEBHOOK_SECRET") {
            self.webhook_secret = v;
        }
        if let Some(v) = get("BRIDGE_ADMIN_TOKEN") {
            self.admin_token = v;
        }

        if let Some(v) = get("BROKER_BASE_URL") {
            self.broker.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = get("BROKER_API_KEY") {
            self.broker.api_key = v;
        }
        if let Some(v) = get("BROKER_API_SECRET") {
            self.broker.api_secret = v;
        }
        if let Some(v) = get("BROKER_ACCOUNT") {
            self.broker.account = v;
        }
        if let Some(v) = get("REQUEST_TIMEOUT") {
            self.broker.request_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("REQUEST_TIMEOUT is not a number of seconds: '{v}'"))?;
        }

        Ok(())
    }

    /// Reject configurations the bridge cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, code) in self.symbol_mapping.iter() {
            if name.trim().is_empty() || code.trim().is_empty() {
                anyhow::bail!("symbol mapping contains a blank entry: '{name}' -> '{code}'");
            }
        }

        if self.rollover_window_days > MAX_ROLLOVER_WINDOW_DAYS {
            anyhow::bail!(
                "rollover window of {} days exceeds the {MAX_ROLLOVER_WINDOW_DAYS}-day maximum",
                self.rollover_window_days
            );
        }

        self.exchange_offset()?;

        if !self.enable_mock && self.broker.base_url.trim().is_empty() {
            anyhow::bail!("live mode requires BROKER_BASE_URL to be set");
        }

        Ok(())
    }

    pub fn exchange_offset(&self) -> Result<FixedOffset> {
        if !(-12..=14).contains(&self.exchange_utc_offset_hours) {
            anyhow::bail!(
                "exchange UTC offset {}h is out of range",
                self.exchange_utc_offset_hours
            );
        }
        FixedOffset::east_opt(self.exchange_utc_offset_hours * 3600)
            .context("invalid exchange UTC offset")
    }

    /// Today's date at the exchange.
    pub fn exchange_today(&self) -> NaiveDate {
        match self.exchange_offset() {
            Ok(offset) => Utc::now().with_timezone(&offset).date_naive(),
            Err(_) => Utc::now().date_naive(),
        }
    }
}

/// Decide the running environment and load the matching `.env_<env>` file.
///
/// `cli_env` is the optional first command-line argument. Cloud-function
/// runs are forced to production and skip env files entirely.
pub fn select_environment(cli_env: Option<&str>) -> AppEnv {
    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        std::env::set_var("APP_ENV", "production");
        return AppEnv::Production;
    }

    let env = cli_env
        .and_then(|v| v.parse::<AppEnv>().ok())
        .or_else(|| {
            std::env::var("APP_ENV")
                .ok()
                .and_then(|v| v.parse::<AppEnv>().ok())
        })
        .unwrap_or_default();
    std::env::set_var("APP_ENV", env.to_string());

    if dotenv::from_filename(env.env_file()).is_err() {
        info!(file = env.env_file(), "no env file loaded, using process environment only");
    }

    env
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_settings_have_expected_values() {
        let s = Settings::default();
        assert_eq!(s.app_env, AppEnv::Development);
        assert_eq!(s.bind_addr, "0.0.0.0:8000");
        assert!(s.enable_mock);
        assert_eq!(s.rollover_window_days, 1);
        assert_eq!(s.unmapped_policy, UnmappedPolicy::Permissive);
        assert_eq!(s.contract_codec, CodecKind::Taifex);
        assert_eq!(s.exchange_utc_offset_hours, 8);
        assert_eq!(s.symbol_mapping.get("小台指"), Some("MXF"));
        assert_eq!(s.broker.request_timeout_secs, 30);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert!(s.enable_mock);
        assert_eq!(s.rollover_window_days, 1);
        assert_eq!(s.symbol_mapping, SymbolMapping::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "unmapped_policy": "strict", "symbol_mapping": { "小台指": "MXF" } }"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.unmapped_policy, UnmappedPolicy::Strict);
        assert_eq!(s.symbol_mapping.len(), 1);
        assert_eq!(s.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn secrets_are_not_serialised_or_debug_printed() {
        let mut s = Settings::default();
        s.webhook_secret = "hook-secret".into();
        s.admin_token = "admin-token".into();
        s.broker.api_secret = "api-secret".into();

        let json = serde_json::to_string(&s).unwrap();
        let debug = format!("{s:?}");
        for secret in ["hook-secret", "admin-token", "api-secret"] {
            assert!(!json.contains(secret), "{secret} leaked into JSON");
            assert!(!debug.contains(secret), "{secret} leaked into Debug");
        }
    }

    #[test]
    fn env_overrides_apply() {
        let mut s = Settings::default();
        s.apply_overrides(overrides(&[
            ("APP_ENV", "production"),
            ("ENABLE_MOCK", "False"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9443"),
            ("ROLLOVER_WINDOW_DAYS", "2"),
            ("UNMAPPED_POLICY", "strict"),
            ("CONTRACT_CODEC", "generic"),
            ("WEBHOOK_SECRET", "s3cret"),
            ("BROKER_BASE_URL", "http://bridge:9000/"),
            ("REQUEST_TIMEOUT", "5"),
        ]))
        .unwrap();

        assert_eq!(s.app_env, AppEnv::Production);
        assert!(!s.enable_mock);
        assert_eq!(s.bind_addr, "127.0.0.1:9443");
        assert_eq!(s.rollover_window_days, 2);
        assert_eq!(s.unmapped_policy, UnmappedPolicy::Strict);
        assert_eq!(s.contract_codec, CodecKind::Generic);
        assert_eq!(s.webhook_secret, "s3cret");
        assert_eq!(s.broker.base_url, "http://bridge:9000");
        assert_eq!(s.broker.request_timeout_secs, 5);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn explicit_bind_addr_wins_over_host_and_port() {
        let mut s = Settings::default();
        s.apply_overrides(overrides(&[("BRIDGE_BIND_ADDR", "0.0.0.0:3001"), ("PORT", "9000")]))
            .unwrap();
        assert_eq!(s.bind_addr, "0.0.0.0:3001");
    }

    #[test]
    fn malformed_overrides_are_errors() {
        let mut s = Settings::default();
        assert!(s.apply_overrides(overrides(&[("PORT", "http")])).is_err());
        assert!(s.apply_overrides(overrides(&[("ROLLOVER_WINDOW_DAYS", "-1")])).is_err());
        assert!(s.apply_overrides(overrides(&[("UNMAPPED_POLICY", "sometimes")])).is_err());
    }

    #[test]
    fn blank_override_values_are_ignored() {
        let mut s = Settings::default();
        s.apply_overrides(overrides(&[("ENABLE_MOCK", "  "), ("PORT", "")]))
            .unwrap();
        assert!(s.enable_mock);
        assert_eq!(s.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn validate_rejects_blank_mapping_entries() {
        let mut s = Settings::default();
        s.symbol_mapping = [("小台指", " ")].into_iter().collect();
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_live_mode_without_bridge() {
        let mut s = Settings::default();
        s.enable_mock = false;
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_bounds_rollover_window() {
        let mut s = Settings::default();
        s.rollover_window_days = MAX_ROLLOVER_WINDOW_DAYS;
        assert!(s.validate().is_ok());

        s.apply_overrides(overrides(&[("ROLLOVER_WINDOW_DAYS", "4000000000")]))
            .unwrap();
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_offset() {
        let mut s = Settings::default();
        s.exchange_utc_offset_hours = 20;
        assert!(s.validate().is_err());
    }

    #[test]
    fn loose_booleans() {
        for v in ["true", "T", "yes", "Y", "1"] {
            assert!(parse_bool(v), "{v}");
        }
        for v in ["false", "0", "no", "off"] {
            assert!(!parse_bool(v), "{v}");
        }
    }
}
