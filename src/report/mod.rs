//! Reporting layer
//!
//! Loads a time window through the `WindowCache`, derives the
//! dashboard aggregates and exposes them over HTTP (`server`).

pub mod aggregate;
pub mod cache;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use log::warn;
use serde::Serialize;

use crate::schema::{Exchange, MarketRow};
use crate::store::VolumeStore;
use crate::util;
use aggregate::{ExchangeShare, HourlyTotal, MarketRank, PivotTable};
use cache::WindowCache;

/// Ranking table of one exchange at the latest timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeTop {
    pub exchange: Exchange,
    pub markets: Vec<MarketRank>,
}

/// Everything the page renders for a non-empty window.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub hours: u32,

    /// Global maximum `datetime_kst` of the window
    #[serde(with = "util::kst_datetime")]
    pub latest: NaiveDateTime,

    pub hourly: Vec<HourlyTotal>,
    pub pivot: PivotTable,
    pub shares: Vec<ExchangeShare>,
    pub top: Vec<ExchangeTop>,

    /// Raw rows of the window
    pub rows: Vec<MarketRow>,
}

impl Report {
    /// `None` when the window holds no rows.
    pub fn build(hours: u32, rows: &[MarketRow]) -> Option<Self> {
        let latest = aggregate::latest_timestamp(rows)?;
        let hourly = aggregate::hourly_totals(rows);

        Some(Self {
            hours,
            latest,
            pivot: aggregate::pivot_hourly(&hourly),
            hourly,
            shares: aggregate::exchange_shares(rows, latest),
            top: Exchange::ALL
                .into_iter()
                .map(|exchange| ExchangeTop {
                    exchange,
                    markets: aggregate::top_markets(rows, latest, exchange, aggregate::TOP_N),
                })
                .collect(),
            rows: rows.to_vec(),
        })
    }
}

/// What the page shows for one request.
///
/// `Empty` and `LoadFailed` are distinct: an unreachable store is
/// never reported as "no data".
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportView {
    Ready(Report),
    Empty { hours: u32 },
    LoadFailed { hours: u32, reason: String },
}

/// Store + cache, shared by all requests.
pub struct ReportService {
    store: Arc<dyn VolumeStore>,
    cache: WindowCache,
}

impl ReportService {
    pub fn new(store: Arc<dyn VolumeStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache: WindowCache::new(cache_ttl),
        }
    }

    pub async fn report(&self, hours: u32) -> ReportView {
        match self.cache.load(self.store.as_ref(), hours).await {
            Ok(rows) => match Report::build(hours, &rows) {
                Some(report) => ReportView::Ready(report),
                None => ReportView::Empty { hours },
            },
            Err(e) => {
                warn!("dashboard load failed: hours={hours} error={e}");
                ReportView::LoadFailed {
                    hours,
                    reason: e.to_string(),
                }
            }
        }
    }
}
