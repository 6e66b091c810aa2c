//! Session configuration and in-memory state.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::api::Recommendation;
use crate::bootstrap::Phase;
use crate::insights::{ForecastView, KpiView};

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base: String,
    /// General per-request deadline.
    pub request_timeout: Duration,
    /// Connectivity probe per-attempt deadline.
    pub probe_timeout: Duration,
    /// Diagnostic health-check deadline.
    pub health_timeout: Duration,
    pub probe_max_attempts: u32,
    /// Fixed wait between failed probe attempts.
    pub probe_delay: Duration,
    /// Wall-clock budget for the whole bootstrap sequence.
    pub bootstrap_deadline: Duration,
    pub refresh_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("IPH_API_BASE")
                .unwrap_or_else(|_| "http://127.0.0.1:5001".to_string()),
            request_timeout: env_ms("REQUEST_TIMEOUT_MS", 15_000),
            probe_timeout: env_ms("PROBE_TIMEOUT_MS", 8_000),
            health_timeout: env_ms("HEALTH_TIMEOUT_MS", 10_000),
            probe_max_attempts: std::env::var("PROBE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            probe_delay: env_ms("PROBE_DELAY_MS", 2_000),
            bootstrap_deadline: env_ms("BOOTSTRAP_DEADLINE_MS", 45_000),
            refresh_interval: env_ms("REFRESH_INTERVAL_MS", 300_000),
        }
    }
}

fn env_ms(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(
        std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_ms),
    )
}

/// Chart window selected by the user: a trailing month count, or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Months(u32),
    All,
}

impl TimeRange {
    /// Value for the `months` query parameter; `All` sends none.
    pub fn months_param(&self) -> Option<u32> {
        match self {
            TimeRange::Months(n) => Some(*n),
            TimeRange::All => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            TimeRange::Months(n) => format!("{}m", n),
            TimeRange::All => "all".to_string(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("all") {
            return Some(TimeRange::All);
        }
        s.trim_end_matches('m').parse().ok().map(TimeRange::Months)
    }
}

/// Everything the session remembers between fetches. Lives for the page
/// session only; snapshots are replaced whole, never patched in place.
#[derive(Debug)]
pub struct SessionState {
    pub phase: Phase,
    pub selected_model: String,
    pub range: TimeRange,
    pub models: Vec<String>,
    pub recommendation: Option<Recommendation>,
    /// Per-model performance insight blobs from `/api/models`.
    pub model_insights: HashMap<String, Value>,
    pub kpi: Option<KpiView>,
    pub forecast: Option<ForecastView>,
    pub in_flight: u32,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            selected_model: String::new(),
            range: TimeRange::All,
            models: Vec::new(),
            recommendation: None,
            model_insights: HashMap::new(),
            kpi: None,
            forecast: None,
            in_flight: 0,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
