//! Derived views over a loaded window.
//!
//! All functions are pure: rows in, aggregates out. Nothing here
//! touches the store.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::schema::{Exchange, MarketRow};
use crate::util;

/// Markets shown per exchange in the ranking tables.
pub const TOP_N: usize = 10;

/// Traded value of one exchange within one hour bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyTotal {
    #[serde(with = "util::kst_datetime")]
    pub hour: NaiveDateTime,
    pub exchange: Exchange,
    pub traded_price: f64,
}

/// Hour-by-exchange table; `values[i]` belongs to `columns[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub columns: Vec<Exchange>,
    pub rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    #[serde(with = "util::kst_datetime")]
    pub hour: NaiveDateTime,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeShare {
    pub exchange: Exchange,
    pub traded_price: f64,
    /// Percentage of the total at that timestamp (0 when the total is 0)
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRank {
    pub market: String,
    pub traded_price: f64,
}

/// Sum of traded value per (hour, exchange), hour ascending.
pub fn hourly_totals(rows: &[MarketRow]) -> Vec<HourlyTotal> {
    let mut sums: BTreeMap<(NaiveDateTime, Exchange), f64> = BTreeMap::new();
    for row in rows {
        *sums
            .entry((util::floor_hour(row.datetime_kst), row.exchange))
            .or_default() += row.traded_price;
    }

    sums.into_iter()
        .map(|((hour, exchange), traded_price)| HourlyTotal {
            hour,
            exchange,
            traded_price,
        })
        .collect()
}

/// Pivots hourly totals with exchanges as columns.
///
/// - Columns: exchanges present in `totals`, canonical order
/// - Missing (hour, exchange) cells are 0
/// - Rows sorted by hour, newest first
pub fn pivot_hourly(totals: &[HourlyTotal]) -> PivotTable {
    let columns: Vec<Exchange> = totals
        .iter()
        .map(|t| t.exchange)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_hour: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
    for t in totals {
        let cells = by_hour
            .entry(t.hour)
            .or_insert_with(|| vec![0.0; columns.len()]);
        if let Some(idx) = columns.iter().position(|c| *c == t.exchange) {
            cells[idx] += t.traded_price;
        }
    }

    PivotTable {
        columns,
        rows: by_hour
            .into_iter()
            .rev()
            .map(|(hour, values)| PivotRow { hour, values })
            .collect(),
    }
}

/// Most recent `datetime_kst` in the window, across all exchanges.
pub fn latest_timestamp(rows: &[MarketRow]) -> Option<NaiveDateTime> {
    rows.iter().map(|r| r.datetime_kst).max()
}

/// Per-exchange total at exactly `at`.
pub fn exchange_shares(rows: &[MarketRow], at: NaiveDateTime) -> Vec<ExchangeShare> {
    let mut sums: BTreeMap<Exchange, f64> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.datetime_kst == at) {
        *sums.entry(row.exchange).or_default() += row.traded_price;
    }

    let total: f64 = sums.values().sum();
    sums.into_iter()
        .map(|(exchange, traded_price)| ExchangeShare {
            exchange,
            traded_price,
            share_pct: if total > 0.0 {
                traded_price / total * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Highest traded markets of one exchange at exactly `at`.
///
/// At most `n` entries, descending by traded value; ties are
/// ordered by market symbol.
pub fn top_markets(
    rows: &[MarketRow],
    at: NaiveDateTime,
    exchange: Exchange,
    n: usize,
) -> Vec<MarketRank> {
    let mut ranked: Vec<MarketRank> = rows
        .iter()
        .filter(|r| r.exchange == exchange && r.datetime_kst == at)
        .map(|r| MarketRank {
            market: r.market.clone(),
            traded_price: r.traded_price,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.traded_price
            .partial_cmp(&a.traded_price)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.market.cmp(&b.market))
    });
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 22)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .unwrap()
    }

    fn row(exchange: Exchange, market: &str, ts: NaiveDateTime, price: f64) -> MarketRow {
        MarketRow {
            exchange,
            market: market.to_string(),
            datetime_kst: ts,
            traded_price: price,
        }
    }

    fn sample() -> Vec<MarketRow> {
        let t = at(13, 0);
        vec![
            row(Exchange::Upbit, "KRW-BTC", t, 100.0),
            row(Exchange::Upbit, "KRW-ETH", t, 50.0),
            row(Exchange::Bithumb, "KRW-BTC", t, 80.0),
        ]
    }

    #[test]
    fn end_to_end_shares_and_ranking() {
        let rows = sample();
        let t = latest_timestamp(&rows).unwrap();

        let shares = exchange_shares(&rows, t);
        let totals: Vec<_> = shares.iter().map(|s| (s.exchange, s.traded_price)).collect();
        assert_eq!(
            totals,
            vec![(Exchange::Upbit, 150.0), (Exchange::Bithumb, 80.0)]
        );

        let top = top_markets(&rows, t, Exchange::Upbit, TOP_N);
        assert_eq!(
            top,
            vec![
                MarketRank { market: "KRW-BTC".into(), traded_price: 100.0 },
                MarketRank { market: "KRW-ETH".into(), traded_price: 50.0 },
            ]
        );
    }

    #[test]
    fn shares_sum_to_one_hundred() {
        let shares = exchange_shares(&sample(), at(13, 0));
        let total: f64 = shares.iter().map(|s| s.share_pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn hourly_totals_floor_and_group() {
        let rows = vec![
            row(Exchange::Upbit, "KRW-BTC", at(12, 0), 10.0),
            row(Exchange::Upbit, "KRW-ETH", at(12, 59), 5.0),
            row(Exchange::Bithumb, "KRW-BTC", at(12, 30), 7.0),
            row(Exchange::Upbit, "KRW-BTC", at(13, 0), 1.0),
        ];

        let totals = hourly_totals(&rows);
        assert_eq!(
            totals,
            vec![
                HourlyTotal { hour: at(12, 0), exchange: Exchange::Upbit, traded_price: 15.0 },
                HourlyTotal { hour: at(12, 0), exchange: Exchange::Bithumb, traded_price: 7.0 },
                HourlyTotal { hour: at(13, 0), exchange: Exchange::Upbit, traded_price: 1.0 },
            ]
        );
    }

    #[test]
    fn pivot_fills_missing_cells_with_zero() {
        let rows = vec![
            row(Exchange::Upbit, "KRW-BTC", at(12, 0), 10.0),
            row(Exchange::Bithumb, "KRW-BTC", at(12, 0), 7.0),
            row(Exchange::Upbit, "KRW-BTC", at(13, 0), 1.0),
        ];

        let pivot = pivot_hourly(&hourly_totals(&rows));

        assert_eq!(pivot.columns, vec![Exchange::Upbit, Exchange::Bithumb]);
        assert_eq!(
            pivot.rows,
            vec![
                PivotRow { hour: at(13, 0), values: vec![1.0, 0.0] },
                PivotRow { hour: at(12, 0), values: vec![10.0, 7.0] },
            ]
        );
    }

    #[test]
    fn top_markets_is_bounded_descending_and_filtered() {
        let t = at(13, 0);
        let mut rows: Vec<_> = (0..15)
            .map(|i| row(Exchange::Upbit, &format!("KRW-U{i:02}"), t, i as f64))
            .collect();
        rows.push(row(Exchange::Bithumb, "KRW-HUGE", t, 1e12));
        rows.push(row(Exchange::Upbit, "KRW-STALE", at(12, 0), 1e12));

        let top = top_markets(&rows, t, Exchange::Upbit, TOP_N);

        assert_eq!(top.len(), 10);
        assert_eq!(top[0].market, "KRW-U14");
        assert!(top.windows(2).all(|w| w[0].traded_price > w[1].traded_price));
        assert!(top.iter().all(|r| r.market.starts_with("KRW-U")));
    }

    #[test]
    fn empty_window_has_no_latest_timestamp() {
        assert_eq!(latest_timestamp(&[]), None);
        assert!(hourly_totals(&[]).is_empty());
        assert!(pivot_hourly(&[]).rows.is_empty());
    }
}
