//! Persistence gateway for the `hourly_volume` table
//!
//! Write path: stamp rows with their exchange and upsert them keyed by
//! (exchange, market, datetime_kst).
//!
//! Read path: every row with `datetime_kst >= now(KST) - hours`,
//! fetched with offset pagination.
//!
//! Neither path returns `Err` to its caller. Outcomes are tagged
//! (`WriteOutcome` / `ReadOutcome`) so callers can tell "saved" from
//! "failed" and "no data" from "load failed".

pub mod memory;
pub mod postgrest;

use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use log::{error, info, warn};

use crate::error::StoreError;
use crate::metrics::METRICS;
use crate::schema::{CollectedCandle, Exchange, MarketRow};
use crate::util;

/// Conflict target of the upsert.
pub const CONFLICT_COLUMNS: &str = "exchange,market,datetime_kst";

/// Projection returned by the read path.
pub const SELECT_COLUMNS: &str = "exchange,market,datetime_kst,traded_price";

/// Result of a write.
#[derive(Debug)]
pub enum WriteOutcome {
    /// Nothing to write; the store was not contacted.
    Skipped,

    /// Rows the store acknowledged.
    Saved { count: usize, elapsed: Duration },

    Failed(StoreError),
}

impl WriteOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, WriteOutcome::Failed(_))
    }
}

/// Result of a windowed read.
#[derive(Debug)]
pub enum ReadOutcome {
    Rows { rows: Vec<MarketRow>, pages: usize },
    Failed(StoreError),
}

/// Backing store for hourly volume rows.
///
/// Implementors provide two primitives:
/// - `write_batch`: one upsert request for the whole batch
/// - `read_page`: one page of rows at or after a threshold
///
/// Stamping, timing, pagination, metrics and logging are shared and
/// live in the provided methods.
#[async_trait::async_trait]
pub trait VolumeStore: Send + Sync {

    /// Short label used in log lines.
    fn name(&self) -> &'static str;

    /// Rows per read page.
    fn page_size(&self) -> usize;

    /// Upserts `rows`; returns how many the store acknowledged.
    async fn write_batch(&self, rows: &[MarketRow]) -> Result<usize, StoreError>;

    /// Rows with `datetime_kst >= threshold`, in a stable order.
    async fn read_page(
        &self,
        threshold: NaiveDateTime,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MarketRow>, StoreError>;

    /// Stamps `rows` with `exchange` and upserts them in one request.
    async fn upsert(&self, exchange: Exchange, rows: &[CollectedCandle]) -> WriteOutcome {
        if rows.is_empty() {
            warn!("[{}] nothing to save, skipping upsert", self.name());
            return WriteOutcome::Skipped;
        }

        let records: Vec<MarketRow> = rows
            .iter()
            .cloned()
            .map(|c| c.into_row(exchange))
            .collect();

        info!(
            "[{}] upsert start: exchange={} rows={}",
            self.name(),
            exchange,
            records.len()
        );

        let t0 = Instant::now();
        match self.write_batch(&records).await {
            Ok(count) => {
                let elapsed = t0.elapsed();
                METRICS.rows_saved.fetch_add(count, Ordering::Relaxed);
                info!(
                    "[{}] upsert done: exchange={} rows={} seconds={:.2}",
                    self.name(),
                    exchange,
                    count,
                    elapsed.as_secs_f64()
                );
                WriteOutcome::Saved { count, elapsed }
            }
            Err(e) => {
                METRICS.write_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    "[{}] upsert failed: exchange={} rows={} error={}",
                    self.name(),
                    exchange,
                    records.len(),
                    e
                );
                WriteOutcome::Failed(e)
            }
        }
    }

    /// Every row from the last `hours` hours (KST).
    async fn read_window(&self, hours: u32) -> ReadOutcome {
        self.read_window_at(util::now_kst(), hours).await
    }

    /// `read_window` against an explicit clock.
    async fn read_window_at(&self, now: NaiveDateTime, hours: u32) -> ReadOutcome {
        let threshold = util::window_threshold(now, hours);
        METRICS.store_reads.fetch_add(1, Ordering::Relaxed);

        let result = paginate(self.page_size(), |offset, limit| {
            self.read_page(threshold, offset, limit)
        })
        .await;

        match result {
            Ok((rows, pages)) => {
                info!(
                    "[{}] loaded {} rows ({} pages) since {}",
                    self.name(),
                    rows.len(),
                    pages,
                    threshold.format(util::KST_FORMAT)
                );
                ReadOutcome::Rows { rows, pages }
            }
            Err(e) => {
                error!("[{}] read failed: hours={} error={}", self.name(), hours, e);
                ReadOutcome::Failed(e)
            }
        }
    }
}

/// Offset pagination.
///
/// Requests pages of `page_size` until a page comes back short
/// (including empty). Returns the accumulated items and the number
/// of pages requested.
pub async fn paginate<T, F, Fut>(page_size: usize, mut fetch: F) -> Result<(Vec<T>, usize), StoreError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, StoreError>>,
{
    let page_size = page_size.max(1);
    let mut items = Vec::new();
    let mut pages = 0;

    loop {
        let page = fetch(pages * page_size, page_size).await?;
        pages += 1;

        let short = page.len() < page_size;
        items.extend(page);
        if short {
            break;
        }
    }

    Ok((items, pages))
}
