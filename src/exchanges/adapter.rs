use serde_json::Value;

use crate::schema::{CollectedCandle, Exchange};
use crate::util;

/// ExchangeAdapter is the core abstraction layer between:
/// - The generic REST client and collection runner
/// - Exchange-specific REST APIs
///
/// Each exchange implementation must:
/// - Name its endpoints
/// - Parse the market catalog
/// - Parse the hourly candle response
///
/// The default parsing methods follow the Upbit v1 response shape,
/// which Bithumb's v1 API mirrors. Adapters override them only
/// where an exchange deviates.
///
/// THREAD SAFETY:
/// - Must be Send + Sync
/// - Adapter instances are shared behind `Arc`
///
pub trait ExchangeAdapter: Send + Sync {

    /// The exchange this adapter speaks for.
    fn exchange(&self) -> Exchange;

    /// Path of the market catalog endpoint.
    fn markets_path(&self) -> &'static str {
        "/v1/market/all"
    }

    /// Path of the 60-minute candle endpoint.
    fn candles_path(&self) -> &'static str {
        "/v1/candles/minutes/60"
    }

    /// Extracts market symbols from a catalog response.
    ///
    /// - Non-object entries and entries without a string `market`
    ///   field are dropped silently.
    /// - `quote` keeps only "{QUOTE}-..." symbols.
    /// - The result is deduplicated and sorted ascending.
    fn parse_markets(&self, body: &Value, quote: Option<&str>) -> Vec<String> {
        let prefix = quote.map(util::quote_prefix);

        let mut markets: Vec<String> = body
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.as_object()?.get("market")?.as_str())
                    .filter(|m| prefix.as_deref().is_none_or(|p| m.starts_with(p)))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        markets.sort();
        markets.dedup();
        markets
    }

    /// Extracts the latest candle from a `count=1` candle response.
    ///
    /// Returns `None` when the response is empty, not an array, or
    /// lacks a parseable time / non-negative traded value.
    ///
    /// IMPORTANT:
    /// - This function must NEVER panic on malformed input.
    fn parse_candle(&self, market: &str, body: &Value) -> Option<CollectedCandle> {
        let first = body.as_array()?.first()?;

        let datetime_kst = first
            .get("candle_date_time_kst")
            .and_then(Value::as_str)
            .and_then(util::parse_kst)?;

        let traded_price = first
            .get("candle_acc_trade_price")
            .and_then(util::non_negative_number)?;

        Some(CollectedCandle {
            market: market.to_string(),
            datetime_kst,
            traded_price,
        })
    }
}
