// ------------------------------------------------------------
// Hourly volume collector
// ------------------------------------------------------------
//
// Runs one collection cycle per enabled exchange, in config
// order, then exits.
//
// Responsibilities:
// - Initialize cryptography backend (rustls)
// - Load configuration and store credentials
// - Initialize console + rotating file logging
// - Run every exchange cycle sequentially
// - Exit non-zero if any catalog load or store write failed
//
use std::sync::Arc;

use anyhow::{bail, Context};
use log::{info, warn};

use hourly_volume::{
    collector::runner::run_configured,
    config::{self, Config, StoreCredentials},
    exchanges::rest,
    logging,
    metrics::METRICS,
    store::{memory::MemoryStore, postgrest::PostgrestStore, VolumeStore},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // --------------------------------------------------------
    // rustls >= 0.23 requires an explicit CryptoProvider
    // installation, as early as possible in the process.
    // --------------------------------------------------------
    rest::install_crypto_provider();

    let config: Config = config::load_config(config::config_path())?;
    logging::init(&config.log_dir, "data_collection")?;

    let http = rest::http_client(config.collector.timeout())?;
    let store = build_store(&config, http.clone())?;

    let failed = run_configured(&config, &http, store.as_ref()).await;

    info!("{}", METRICS.summary());

    if !failed.is_empty() {
        bail!("collection failed for: {}", failed.join(", "));
    }

    info!("all collection cycles finished");
    Ok(())
}

// ------------------------------------------------------------
// Store selection
// ------------------------------------------------------------
//
// Demo mode keeps rows in memory for the lifetime of the
// process. Otherwise both Supabase variables are required.
//
fn build_store(config: &Config, http: reqwest::Client) -> anyhow::Result<Arc<dyn VolumeStore>> {
    if config.store.demo {
        warn!("store running in DEMO mode, rows are kept in memory only");
        return Ok(Arc::new(MemoryStore::new(config.store.page_size)));
    }

    let credentials = StoreCredentials::from_env().context("store credentials")?;
    info!("store client initialized: {}", credentials.url);
    Ok(Arc::new(PostgrestStore::new(http, credentials, &config.store)))
}
