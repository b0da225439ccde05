// =============================================================================
// Signal matchers — tiered patterns over raw alert text
// =============================================================================
//
// Alerts loosely follow
//
//   ...訂單<action> @ <quantity>已成交<ticker>。新策略倉位是<position>
//
// Three matchers of decreasing specificity are tried in order by the parser:
//
//   1. Strict     — every literal marker present, action directly after 訂單.
//   2. Relaxed    — same shape without the leading 訂單 marker.
//   3. Permissive — action @ quantity, then any token, then a signed integer,
//                   with arbitrary text in between.
//
// A matcher only extracts raw text groups; validation happens in the parser.
// =============================================================================

use std::sync::LazyLock;

use regex::{Captures, Regex};

static STRICT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"訂單(\w+)\s*@\s*(\d+)已成交([\w!]+).*?新策略倉位是(-?\d+)")
        .expect("strict signal pattern is valid")
});

static RELAXED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s*@\s*(\d+)已成交([\w!]+).*?新策略倉位是(-?\d+)")
        .expect("relaxed signal pattern is valid")
});

static PERMISSIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s*@\s*(\d+).*?([\w!]+).*?(-?\d+)")
        .expect("permissive signal pattern is valid")
});

/// Unvalidated groups captured from an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSignal {
    pub action: String,
    pub quantity: String,
    pub ticker: String,
    pub position: String,
}

impl RawSignal {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        Some(Self {
            action: caps.get(1)?.as_str().to_string(),
            quantity: caps.get(2)?.as_str().to_string(),
            ticker: caps.get(3)?.as_str().to_string(),
            position: caps.get(4)?.as_str().to_string(),
        })
    }
}

/// One strategy for pulling a [`RawSignal`] out of alert text.
pub trait SignalMatcher: Send + Sync {
    /// Short tier name used in logs.
    fn name(&self) -> &'static str;

    fn attempt(&self, text: &str) -> Option<RawSignal>;
}

fn capture(pattern: &Regex, text: &str) -> Option<RawSignal> {
    pattern
        .captures(text)
        .and_then(|caps| RawSignal::from_captures(&caps))
}

pub struct StrictMatcher;

impl SignalMatcher for StrictMatcher {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn attempt(&self, text: &str) -> Option<RawSignal> {
        capture(&STRICT_PATTERN, text)
    }
}

pub struct RelaxedMatcher;

impl SignalMatcher for RelaxedMatcher {
    fn name(&self) -> &'static str {
        "relaxed"
    }

    fn attempt(&self, text: &str) -> Option<RawSignal> {
        capture(&RELAXED_PATTERN, text)
    }
}

pub struct PermissiveMatcher;

impl SignalMatcher for PermissiveMatcher {
    fn name(&self) -> &'static str {
        "permissive"
    }

    fn attempt(&self, text: &str) -> Option<RawSignal> {
        capture(&PERMISSIVE_PATTERN, text)
    }
}

/// The standard tiers in priority order.
pub fn default_matchers() -> Vec<Box<dyn SignalMatcher>> {
    vec![
        Box::new(StrictMatcher),
        Box::new(RelaxedMatcher),
        Box::new(PermissiveMatcher),
    ]
}
