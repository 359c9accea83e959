use crate::schema::Exchange;

use super::adapter::ExchangeAdapter;

/// Bithumb REST adapter
///
/// Public API v1 (Upbit-compatible paths):
/// https://apidocs.bithumb.com
///
/// Catalog:  GET /v1/market/all
/// Candles:  GET /v1/candles/minutes/60?market=KRW-BTC&count=1
///
/// Bithumb wraps failures as `{"status": "5600", "message": ...}`
/// with a 200 status. The default catalog parser only reads arrays,
/// so such an envelope yields no markets.
pub struct BithumbAdapter;

impl ExchangeAdapter for BithumbAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Bithumb
    }
}
