// ------------------------------------------------------------
// Hourly volume dashboard
// ------------------------------------------------------------
//
// Serves the interactive report page over the `hourly_volume`
// table until interrupted.
//
use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};

use hourly_volume::{
    collector::runner::run_configured,
    config::{self, StoreCredentials},
    exchanges::rest,
    logging,
    report::{
        server::{router, AppState},
        ReportService,
    },
    store::{memory::MemoryStore, postgrest::PostgrestStore, VolumeStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rest::install_crypto_provider();

    let config = config::load_config(config::config_path())?;
    logging::init(&config.log_dir, "dashboard")?;

    let http = rest::http_client(config.collector.timeout())?;

    // Demo mode has no shared table: one collection cycle seeds the
    // in-memory store before serving.
    let store: Arc<dyn VolumeStore> = if config.store.demo {
        warn!("store running in DEMO mode, seeding the in-memory table with one collection cycle");
        let memory = Arc::new(MemoryStore::new(config.store.page_size));
        let failed = run_configured(&config, &http, memory.as_ref()).await;
        if !failed.is_empty() {
            warn!("demo seeding incomplete for: {}", failed.join(", "));
        }
        memory
    } else {
        let credentials = StoreCredentials::from_env().context("store credentials")?;
        Arc::new(PostgrestStore::new(http, credentials, &config.store))
    };

    let state = AppState {
        service: Arc::new(ReportService::new(store, config.dashboard.cache_ttl())),
        default_hours: config.dashboard.default_hours,
    };

    let listener = tokio::net::TcpListener::bind(&config.dashboard.bind)
        .await
        .with_context(|| format!("binding {}", config.dashboard.bind))?;
    info!("dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
