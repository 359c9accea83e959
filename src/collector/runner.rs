use std::sync::atomic::Ordering;
use std::time::Duration;

use log::{error, info, warn};
use tokio::time::sleep;

use crate::{
    config::{CollectorConfig, Config},
    error::CollectorError,
    exchanges::{self, rest::RestClient, MarketSource},
    metrics::METRICS,
    schema::{CollectedCandle, Exchange},
    store::{VolumeStore, WriteOutcome},
};

/// Pacing for one collection cycle.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Sleep after every market request
    pub request_delay: Duration,

    /// Log progress every N markets (0 disables)
    pub progress_every: usize,
}

impl From<&CollectorConfig> for RunOptions {
    fn from(cfg: &CollectorConfig) -> Self {
        Self {
            request_delay: cfg.request_delay(),
            progress_every: cfg.progress_every,
        }
    }
}

/// Outcome of a cycle that reached the store.
#[derive(Debug)]
pub struct CollectionSummary {
    pub exchange: Exchange,
    pub markets: usize,
    pub rows: usize,
    /// Markets that produced no row, in iteration order
    pub failed: Vec<String>,
    pub write: WriteOutcome,
}

/// How a collection cycle ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The market catalog could not be loaded; nothing was fetched.
    CatalogFailed {
        exchange: Exchange,
        error: CollectorError,
    },

    /// Every market failed (or the catalog was empty); nothing was written.
    NoRows {
        exchange: Exchange,
        markets: usize,
        failed: Vec<String>,
    },

    Completed(CollectionSummary),
}

impl RunOutcome {
    /// Catalog failures and failed writes count against the process.
    pub fn is_failure(&self) -> bool {
        match self {
            RunOutcome::CatalogFailed { .. } => true,
            RunOutcome::NoRows { .. } => false,
            RunOutcome::Completed(summary) => summary.write.is_failed(),
        }
    }
}

/// Runs one full collection cycle for a single exchange.
///
/// Steps:
/// 1. Load the market catalog (fatal to the cycle on failure)
/// 2. Fetch the latest hourly candle of every market, in order
/// 3. Upsert the collected rows tagged with the exchange
///
/// GUARANTEES:
/// - A single market failure never aborts the cycle
/// - Markets are processed strictly one at a time
/// - The store is not contacted when no row was collected
///
pub async fn run_exchange(
    source: &dyn MarketSource,
    store: &dyn VolumeStore,
    quote: Option<&str>,
    opts: &RunOptions,
) -> RunOutcome {
    let exchange = source.exchange();
    info!("[{exchange}] collection started");

    let markets = match source.list_markets(quote).await {
        Ok(markets) => markets,
        Err(e) => {
            METRICS.catalog_failures.fetch_add(1, Ordering::Relaxed);
            error!("[{exchange}] failed to load market list: {e}");
            return RunOutcome::CatalogFailed { exchange, error: e };
        }
    };

    METRICS.markets_listed.fetch_add(markets.len(), Ordering::Relaxed);
    info!("[{exchange}] collecting {} markets", markets.len());

    let (rows, failed) = collect_candles(source, &markets, opts).await;

    if !failed.is_empty() {
        warn!(
            "[{exchange}] {} of {} markets produced no row",
            failed.len(),
            markets.len()
        );
    }

    if rows.is_empty() {
        warn!("[{exchange}] no data collected, nothing to save");
        return RunOutcome::NoRows {
            exchange,
            markets: markets.len(),
            failed,
        };
    }

    let write = store.upsert(exchange, &rows).await;
    info!("[{exchange}] collection finished");

    RunOutcome::Completed(CollectionSummary {
        exchange,
        markets: markets.len(),
        rows: rows.len(),
        failed,
        write,
    })
}

/// Runs one cycle per enabled exchange from `config`, in config order.
///
/// Returns the names of the exchanges whose cycle counts as failed:
/// unknown identifiers, catalog failures and failed writes.
pub async fn run_configured(
    config: &Config,
    http: &reqwest::Client,
    store: &dyn VolumeStore,
) -> Vec<String> {
    let opts = RunOptions::from(&config.collector);
    let mut failed = Vec::new();

    for exchange_cfg in config.exchanges.iter().filter(|e| e.enabled) {
        let resolved = Exchange::parse(&exchange_cfg.name).and_then(|exchange| {
            config
                .collector
                .base_url(exchange.name())
                .map(|url| (exchange, url))
        });
        let (exchange, base_url) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("{e}");
                failed.push(exchange_cfg.name.clone());
                continue;
            }
        };

        let source = RestClient::new(http.clone(), exchanges::get_adapter(exchange), base_url);
        let outcome = run_exchange(&source, store, exchange_cfg.quote.as_deref(), &opts).await;
        report_outcome(&outcome);

        if outcome.is_failure() {
            failed.push(exchange.to_string());
        }
    }

    failed
}

fn report_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::CatalogFailed { exchange, error } => {
            error!("[{exchange}] cycle aborted: {error}");
        }
        RunOutcome::NoRows { exchange, markets, failed } => {
            warn!(
                "[{exchange}] cycle finished without data: markets={markets} failed={}",
                failed.len()
            );
        }
        RunOutcome::Completed(summary) => {
            info!(
                "[{}] cycle finished: markets={} rows={} failed={} write={:?}",
                summary.exchange,
                summary.markets,
                summary.rows,
                summary.failed.len(),
                summary.write
            );
        }
    }
}

/// Fetches the latest candle of each market in order.
///
/// Returns the collected rows and the markets that failed, either
/// because the request errored or the response had the wrong shape.
async fn collect_candles(
    source: &dyn MarketSource,
    markets: &[String],
    opts: &RunOptions,
) -> (Vec<CollectedCandle>, Vec<String>) {
    let exchange = source.exchange();
    let mut rows = Vec::with_capacity(markets.len());
    let mut failed = Vec::new();

    for (i, market) in markets.iter().enumerate() {
        match source.fetch_latest_hour(market).await {
            Ok(body) => match source.parse_candle(market, &body) {
                Some(candle) => {
                    METRICS.candles_collected.fetch_add(1, Ordering::Relaxed);
                    rows.push(candle);
                }
                None => {
                    METRICS.candle_failures.fetch_add(1, Ordering::Relaxed);
                    warn!("[{exchange}] '{market}' empty or malformed candle: {body}");
                    failed.push(market.clone());
                }
            },
            Err(e) => {
                METRICS.candle_failures.fetch_add(1, Ordering::Relaxed);
                error!("[{exchange}] '{market}' candle fetch failed: {e}");
                failed.push(market.clone());
            }
        }

        sleep(opts.request_delay).await;

        let done = i + 1;
        if opts.progress_every > 0 && done % opts.progress_every == 0 {
            info!("[{exchange}] progress: {done}/{}", markets.len());
        }
    }

    (rows, failed)
}
