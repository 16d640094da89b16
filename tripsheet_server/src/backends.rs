//! Wiring of concrete collaborators for the CLI.

use std::sync::Arc;
use tripsheet_core::store::sqlite::SqliteSnapshotStore;
use tripsheet_core::{Error, Result, SnapshotStore, StoreConfig, SyncConfig, SyncDeps, SyncEngine};
use tripsheet_integrations::google_places::GooglePlacesClient;
use tripsheet_integrations::google_sheets::GoogleSheetsClient;

fn required_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{key} is not set")))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn build_store(cfg: &StoreConfig) -> Result<Arc<dyn SnapshotStore>> {
    let store = SqliteSnapshotStore::new(&cfg.cache_db).await?;
    Ok(Arc::new(store))
}

/// Engine over Google Sheets, Google Places and the SQLite cache.
///
/// Missing credentials fail here, before any remote call.
#[tracing::instrument(level = "info", skip_all)]
pub async fn build_engine(config: SyncConfig, store_cfg: &StoreConfig) -> Result<SyncEngine> {
    let sheets = GoogleSheetsClient::new(required_env("GOOGLE_SHEETS_ACCESS_TOKEN")?)?;
    let places = GooglePlacesClient::new(required_env("GOOGLE_PLACES_API_KEY")?)?;
    let deps = SyncDeps {
        sheets: Arc::new(sheets),
        places: Arc::new(places),
        store: build_store(store_cfg).await?,
    };
    Ok(SyncEngine::from_deps(deps, config))
}
