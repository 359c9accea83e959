use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::schema::MarketRow;
use crate::store::{ReadOutcome, VolumeStore};

struct CacheEntry {
    rows: Arc<Vec<MarketRow>>,
    fetched_at: Instant,
}

/// Loaded windows keyed by lookback hours.
///
/// - An entry is reused while `fetched_at + ttl` is in the future
/// - Failed loads are never cached
/// - The lock is held across a load, so concurrent requests for a
///   cold window trigger one store read
pub struct WindowCache {
    ttl: Duration,
    entries: Mutex<HashMap<u32, CacheEntry>>,
}

impl WindowCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Rows of the `hours` window, from cache or from `store`.
    pub async fn load(
        &self,
        store: &dyn VolumeStore,
        hours: u32,
    ) -> Result<Arc<Vec<MarketRow>>, StoreError> {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(&hours) {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!("window cache hit: hours={hours}");
                return Ok(entry.rows.clone());
            }
        }

        let rows = match store.read_window(hours).await {
            ReadOutcome::Rows { rows, .. } => Arc::new(rows),
            ReadOutcome::Failed(e) => return Err(e),
        };

        let ttl = self.ttl;
        entries.retain(|_, e| e.fetched_at.elapsed() < ttl);
        entries.insert(
            hours,
            CacheEntry {
                rows: rows.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(rows)
    }
}
