//! Exchange adapter registry and market source contract
//!
//! This module provides:
//! - Resolution of exchange identifiers to endpoints
//! - A factory function returning the adapter for an exchange
//! - The `MarketSource` trait the collection runner depends on
//!
//! All exchange-specific logic must live in dedicated adapter modules.

pub mod adapter;
pub mod bithumb;
pub mod rest;
pub mod upbit;

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::schema::{CollectedCandle, Exchange};
use adapter::ExchangeAdapter;

/// Resolves an exchange identifier (any casing) to its base endpoint.
///
/// Fails with `UnsupportedExchange` naming every supported exchange.
pub fn resolve(exchange: &str) -> Result<&'static str> {
    Exchange::parse(exchange).map(Exchange::base_url)
}

/// Returns the adapter for an exchange.
///
/// Adapters are stateless and wrapped in `Arc` so the same instance
/// can be shared by clients and tasks.
pub fn get_adapter(exchange: Exchange) -> Arc<dyn ExchangeAdapter> {
    match exchange {
        Exchange::Upbit => Arc::new(upbit::UpbitAdapter),
        Exchange::Bithumb => Arc::new(bithumb::BithumbAdapter),
    }
}

/// Read side of one exchange's REST API, as seen by the runner.
///
/// CONTRACT:
/// - `list_markets` returns unique symbols in ascending order
/// - `fetch_latest_hour` returns the raw decoded candle response
/// - Neither method retries
#[async_trait::async_trait]
pub trait MarketSource: Send + Sync {

    fn exchange(&self) -> Exchange;

    async fn list_markets(&self, quote: Option<&str>) -> Result<Vec<String>>;

    async fn fetch_latest_hour(&self, market: &str) -> Result<Value>;

    /// Shape check + extraction of one fetched response.
    fn parse_candle(&self, market: &str, body: &Value) -> Option<CollectedCandle>;
}
