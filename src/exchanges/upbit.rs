use crate::schema::Exchange;

use super::adapter::ExchangeAdapter;

/// Upbit REST adapter
///
/// Quotation API:
/// https://docs.upbit.com/reference
///
/// Catalog:  GET /v1/market/all
/// Candles:  GET /v1/candles/minutes/60?market=KRW-BTC&count=1
///
/// The default trait parsing is written against Upbit's response
/// shape, so nothing is overridden here.
pub struct UpbitAdapter;

impl ExchangeAdapter for UpbitAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Upbit
    }
}
