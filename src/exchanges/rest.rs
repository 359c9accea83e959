use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Url;
use serde_json::Value;

use crate::error::{CollectorError, Result};
use crate::schema::{CollectedCandle, Exchange};

use super::adapter::ExchangeAdapter;
use super::MarketSource;

/// Fixed request identity sent to both exchanges.
const ACCEPT_VALUE: &str = "application/json";
const USER_AGENT_VALUE: &str = "hourly-data/1.0";

/// Installs the `ring` rustls provider for this process.
///
/// rustls >= 0.23 requires an explicit CryptoProvider when more than
/// one backend is compiled in. Repeated calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Builds the HTTP client shared by all REST calls.
///
/// - Fixed `Accept` / `User-Agent` header pair
/// - One timeout per request (connect + body)
/// - No retries; callers decide what a failure means
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    install_crypto_provider();

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(CollectorError::from)
}

/// REST client for one exchange.
///
/// Owns:
/// - the exchange adapter (paths + parsing)
/// - the resolved base URL (public endpoint or config override)
///
/// Every call issues exactly one GET.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    adapter: Arc<dyn ExchangeAdapter>,
    base_url: String,
}

impl RestClient {
    pub fn new(http: reqwest::Client, adapter: Arc<dyn ExchangeAdapter>, base_url: String) -> Self {
        Self {
            http,
            adapter,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed
            .map_err(|e| CollectorError::Upstream(format!("invalid url {}{path}: {e}", self.base_url)))
    }

    /// GET + status check + JSON decode.
    async fn get_json(&self, url: Url) -> Result<Value> {
        debug!("GET {url}");

        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CollectorError::Upstream(format!("{url} returned {status}")));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| CollectorError::Upstream(format!("invalid JSON from {url}: {e}")))
    }
}

#[async_trait::async_trait]
impl MarketSource for RestClient {

    fn exchange(&self) -> Exchange {
        self.adapter.exchange()
    }

    async fn list_markets(&self, quote: Option<&str>) -> Result<Vec<String>> {
        let url = self.url(self.adapter.markets_path(), &[])?;
        let body = self.get_json(url).await?;
        Ok(self.adapter.parse_markets(&body, quote))
    }

    async fn fetch_latest_hour(&self, market: &str) -> Result<Value> {
        let url = self.url(
            self.adapter.candles_path(),
            &[("market", market), ("count", "1")],
        )?;
        self.get_json(url).await
    }

    fn parse_candle(&self, market: &str, body: &Value) -> Option<CollectedCandle> {
        self.adapter.parse_candle(market, body)
    }
}
