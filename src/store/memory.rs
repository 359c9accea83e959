use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::schema::{Exchange, MarketRow};

use super::VolumeStore;

type Key = (NaiveDateTime, Exchange, String);

/// In-process store used in demo mode.
///
/// Same conflict semantics as the backing table: one value per
/// (exchange, market, datetime_kst), last write wins. Rows are kept
/// ordered by (datetime_kst, exchange, market), which is also the
/// page order.
pub struct MemoryStore {
    rows: Mutex<BTreeMap<Key, f64>>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            page_size,
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait::async_trait]
impl VolumeStore for MemoryStore {

    fn name(&self) -> &'static str {
        "memory"
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn write_batch(&self, rows: &[MarketRow]) -> Result<usize, StoreError> {
        let mut map = self.rows.lock().await;
        for row in rows {
            map.insert(
                (row.datetime_kst, row.exchange, row.market.clone()),
                row.traded_price,
            );
        }
        Ok(rows.len())
    }

    async fn read_page(
        &self,
        threshold: NaiveDateTime,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MarketRow>, StoreError> {
        let map = self.rows.lock().await;
        Ok(map
            .iter()
            .filter(|((ts, _, _), _)| *ts >= threshold)
            .skip(offset)
            .take(limit)
            .map(|((ts, exchange, market), price)| MarketRow {
                exchange: *exchange,
                market: market.clone(),
                datetime_kst: *ts,
                traded_price: *price,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CollectedCandle;
    use crate::store::{ReadOutcome, WriteOutcome};
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 22)
            .and_then(|d| d.and_hms_opt(13, 0, 0))
            .unwrap()
    }

    fn candle(market: &str, ts: NaiveDateTime, price: f64) -> CollectedCandle {
        CollectedCandle {
            market: market.to_string(),
            datetime_kst: ts,
            traded_price: price,
        }
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let store = MemoryStore::default();

        store.upsert(Exchange::Upbit, &[candle("KRW-BTC", t0(), 1.0)]).await;
        let outcome = store.upsert(Exchange::Upbit, &[candle("KRW-BTC", t0(), 2.0)]).await;
        assert!(matches!(outcome, WriteOutcome::Saved { count: 1, .. }));

        assert_eq!(store.len().await, 1);
        let ReadOutcome::Rows { rows, .. } = store.read_window_at(t0(), 1).await else {
            panic!("read failed");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].traded_price, 2.0);
        assert_eq!(rows[0].exchange, Exchange::Upbit);
    }

    #[tokio::test]
    async fn same_market_on_two_exchanges_is_two_rows() {
        let store = MemoryStore::default();

        store.upsert(Exchange::Upbit, &[candle("KRW-BTC", t0(), 1.0)]).await;
        store.upsert(Exchange::Bithumb, &[candle("KRW-BTC", t0(), 1.0)]).await;

        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn empty_batch_is_skipped() {
        let store = MemoryStore::default();
        assert!(matches!(store.upsert(Exchange::Upbit, &[]).await, WriteOutcome::Skipped));
    }

    #[tokio::test]
    async fn window_is_inclusive_of_lower_bound() {
        let store = MemoryStore::default();
        let now = t0();
        store
            .upsert(
                Exchange::Upbit,
                &[
                    candle("KRW-AT-BOUND", now - Duration::hours(24), 1.0),
                    candle("KRW-TOO-OLD", now - Duration::hours(24) - Duration::seconds(1), 1.0),
                    candle("KRW-RECENT", now - Duration::hours(1), 1.0),
                ],
            )
            .await;

        let ReadOutcome::Rows { rows, .. } = store.read_window_at(now, 24).await else {
            panic!("read failed");
        };
        let markets: Vec<_> = rows.iter().map(|r| r.market.as_str()).collect();
        assert_eq!(markets, vec!["KRW-AT-BOUND", "KRW-RECENT"]);
    }

    #[tokio::test]
    async fn reads_2500_rows_in_three_pages() {
        let store = MemoryStore::new(1000);
        let now = t0();
        let batch: Vec<_> = (0..2500)
            .map(|i| candle(&format!("KRW-C{i:04}"), now - Duration::hours(1), i as f64))
            .collect();
        store.upsert(Exchange::Bithumb, &batch).await;

        let ReadOutcome::Rows { rows, pages } = store.read_window_at(now, 24).await else {
            panic!("read failed");
        };
        assert_eq!(pages, 3);
        assert_eq!(rows.len(), 2500);

        let mut markets: Vec<_> = rows.iter().map(|r| r.market.clone()).collect();
        markets.dedup();
        assert_eq!(markets.len(), 2500);
    }
}
