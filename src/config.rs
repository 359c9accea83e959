use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CollectorError, Result};
use crate::exchanges;
use crate::schema::Exchange;

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// This is the top-level configuration structure loaded from
// `config.json` (path overridable through `VOLUME_CONFIG`).
//
// Every field has a default, so a missing file is not an error.
// Secrets are NOT part of this file; see `StoreCredentials`.
//
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Exchanges to collect, in run order
    pub exchanges: Vec<ExchangeConfig>,

    /// Request pacing and upstream endpoints
    pub collector: CollectorConfig,

    /// Backing store settings
    pub store: StoreConfig,

    /// Reporting page settings
    pub dashboard: DashboardConfig,

    /// Directory for rotating log files
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchanges: Exchange::ALL
                .iter()
                .map(|e| ExchangeConfig {
                    name: e.name().to_string(),
                    enabled: true,
                    quote: Some("KRW".to_string()),
                })
                .collect(),
            collector: CollectorConfig::default(),
            store: StoreConfig::default(),
            dashboard: DashboardConfig::default(),
            log_dir: "logs".to_string(),
        }
    }
}

// ------------------------------------------------------------
// Exchange configuration
// ------------------------------------------------------------
//
// Configuration for a single collection cycle.
//
// `name` is resolved case-insensitively at run time; unknown
// names are logged and skipped by the entry point.
//
#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    /// Exchange identifier (e.g. "upbit", "bithumb")
    pub name: String,

    /// Enables or disables this exchange at runtime
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quote currency filter (e.g. "KRW"); `None` collects all markets
    #[serde(default)]
    pub quote: Option<String>,
}

fn default_true() -> bool {
    true
}

// ------------------------------------------------------------
// Collector configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectorConfig {
    /// Fixed delay after every market request
    pub request_delay_ms: u64,

    /// Log progress every N markets
    pub progress_every: usize,

    /// Per-request HTTP timeout
    pub timeout_secs: u64,

    /// Base URL overrides keyed by exchange name
    pub base_urls: HashMap<String, String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 100,
            progress_every: 100,
            timeout_secs: 20,
            base_urls: HashMap::new(),
        }
    }
}

impl CollectorConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured override, or the exchange's public endpoint.
    ///
    /// Unknown exchanges fail even when an override exists.
    pub fn base_url(&self, exchange: &str) -> Result<String> {
        let public = exchanges::resolve(exchange)?;
        let url = self
            .base_urls
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(exchange.trim()))
            .map_or(public, |(_, v)| v.as_str());
        Ok(url.trim_end_matches('/').to_string())
    }
}

// ------------------------------------------------------------
// Store configuration
// ------------------------------------------------------------
//
// `demo` swaps the backing store for an in-process map:
// - no credentials required
// - nothing survives the process
//
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub demo: bool,

    pub table: String,

    /// Rows per read page (PostgREST max-rows default)
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            demo: false,
            table: "hourly_volume".to_string(),
            page_size: 1000,
        }
    }
}

// ------------------------------------------------------------
// Dashboard configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,

    /// How long a loaded window is reused
    pub cache_ttl_secs: u64,

    /// Initial slider position
    pub default_hours: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            cache_ttl_secs: 600,
            default_hours: 24,
        }
    }
}

impl DashboardConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// ------------------------------------------------------------
// Store credentials
// ------------------------------------------------------------
//
// Read from the process environment (after loading `.env`).
//
// NOTE:
// - The service key is security-sensitive and must never be
//   logged or committed.
//
#[derive(Clone)]
pub struct StoreCredentials {
    pub url: String,
    pub service_key: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

impl StoreCredentials {
    pub const URL_VAR: &'static str = "SUPABASE_URL";
    pub const KEY_VAR: &'static str = "SUPABASE_SERVICE_ROLE_KEY";

    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Both values are required; blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CollectorError::Config(format!("{k} is not set")))
        };

        Ok(Self {
            url: get(Self::URL_VAR)?.trim_end_matches('/').to_string(),
            service_key: get(Self::KEY_VAR)?,
        })
    }
}

// ------------------------------------------------------------
// Configuration loader
// ------------------------------------------------------------
//
// Reads a JSON configuration file from disk and deserializes it
// into the strongly typed `Config` structure. A missing file
// yields the defaults.
//
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }

    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|e| CollectorError::Config(format!("{}: {e}", path.display())))
}

/// Config path from `VOLUME_CONFIG`, falling back to `config.json`.
pub fn config_path() -> String {
    std::env::var("VOLUME_CONFIG").unwrap_or_else(|_| "config.json".to_string())
}
