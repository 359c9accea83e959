use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Process-wide collection metrics.
///
/// Purpose:
/// - Track catalog size and per-market outcomes
/// - Track store writes and reads
///
/// Design:
/// - Lock-free (Atomics)
/// - Logged once as a single `[METRICS]` line
#[derive(Default)]
pub struct RuntimeMetrics {
    // Catalog
    pub markets_listed: AtomicUsize,
    pub catalog_failures: AtomicUsize,

    // Per-market
    pub candles_collected: AtomicUsize,
    pub candle_failures: AtomicUsize,

    // Store
    pub rows_saved: AtomicUsize,
    pub write_failures: AtomicUsize,
    pub store_reads: AtomicUsize,
}

impl RuntimeMetrics {
    pub fn summary(&self) -> String {
        format!(
            "[METRICS] markets={} catalog_err={} candles={} candle_err={} saved={} write_err={} reads={}",
            self.markets_listed.load(Ordering::Relaxed),
            self.catalog_failures.load(Ordering::Relaxed),
            self.candles_collected.load(Ordering::Relaxed),
            self.candle_failures.load(Ordering::Relaxed),
            self.rows_saved.load(Ordering::Relaxed),
            self.write_failures.load(Ordering::Relaxed),
            self.store_reads.load(Ordering::Relaxed),
        )
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> =
    Lazy::new(|| Arc::new(RuntimeMetrics::default()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_every_counter() {
        let m = RuntimeMetrics::default();
        m.candles_collected.fetch_add(3, Ordering::Relaxed);

        let line = m.summary();
        assert!(line.starts_with("[METRICS]"));
        assert!(line.contains("candles=3"));
        assert!(line.contains("write_err=0"));
    }
}
