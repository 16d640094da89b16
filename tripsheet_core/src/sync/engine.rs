use crate::config::SyncConfig;
use crate::lookup::traits::PlaceLookup;
use crate::models::{OwnerId, SheetSource};
use crate::sheets::a1;
use crate::sheets::traits::Spreadsheet;
use crate::store::traits::SnapshotStore;
use crate::sync::columns::{plan_header_repair, resolve_columns};
use crate::sync::enrich::{EnrichmentBudget, EnrichmentExecutor};
use crate::sync::itinerary;
use crate::sync::locks::OwnerLocks;
use crate::sync::models::{
    CanonicalRecord, ColumnMap, IdStrategy, ItineraryItem, LocationPatch, LocationSyncReport,
    PendingWrite, SyncStatus,
};
use crate::sync::publisher::CachePublisher;
use crate::sync::selector::select_for_enrichment;
use crate::sync::traits::{SyncDeps, TripSync};
use crate::sync::transform::{photo_url, transform_rows};
use crate::sync::writeback::write_back;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;
use uuid::Uuid;

/// Locations tab after column resolution (and header repair, when it was needed).
struct LocationsTab {
    rows: Vec<Vec<String>>,
    map: ColumnMap,
    header_repaired: bool,
}

/// Default `TripSync` implementation.
pub struct SyncEngine {
    sheets: Arc<dyn Spreadsheet>,
    places: Arc<dyn PlaceLookup>,
    publisher: CachePublisher,
    config: SyncConfig,
    locks: Option<Arc<OwnerLocks>>,
}

impl SyncEngine {
    #[tracing::instrument(level = "debug", skip(sheets, places, store))]
    pub fn new(
        sheets: Arc<dyn Spreadsheet>,
        places: Arc<dyn PlaceLookup>,
        store: Arc<dyn SnapshotStore>,
        config: SyncConfig,
    ) -> Self {
        let locks = config.owner_locks.then(|| Arc::new(OwnerLocks::new()));
        Self {
            sheets,
            places,
            publisher: CachePublisher::new(store),
            config,
            locks,
        }
    }

    pub fn from_deps(deps: SyncDeps, config: SyncConfig) -> Self {
        Self::new(deps.sheets, deps.places, deps.store, config)
    }

    /// Serialize mutating operations per owner within this process.
    pub fn with_owner_locks(mut self, locks: Arc<OwnerLocks>) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    async fn guard(&self, owner_id: &OwnerId) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(owner_id).await),
            None => None,
        }
    }

    fn transform(&self, tab: &LocationsTab) -> Vec<CanonicalRecord> {
        let places = &self.places;
        transform_rows(
            &tab.rows,
            &tab.map,
            self.config.id_strategy,
            &self.config.price,
            &|r: &str| places.photo_url_for(r),
        )
    }

    /// Read the whole locations tab, resolve columns and persist a header repair.
    ///
    /// The repair is written before anything addresses a row by column index.
    #[tracing::instrument(level = "debug", skip(self))]
    async fn load_locations_tab(&self, spreadsheet_id: &str) -> Result<LocationsTab> {
        let tab = &self.config.locations_tab;
        let mut rows = self
            .sheets
            .read_range(spreadsheet_id, &a1::tab_range(tab))
            .await?;
        if rows.is_empty() {
            return Ok(LocationsTab {
                rows,
                map: ColumnMap::default(),
                header_repaired: false,
            });
        }

        let header = rows.remove(0);
        let map = resolve_columns(&header);
        let Some(repair) = plan_header_repair(&header, &map) else {
            return Ok(LocationsTab {
                rows,
                map,
                header_repaired: false,
            });
        };

        // Only the appended cells; existing header cells are left as they are.
        let first = header.len();
        let range = a1::span(tab, first, 1, repair.header.len() - 1, Some(1));
        self.sheets
            .write_range(spreadsheet_id, &range, vec![repair.header[first..].to_vec()])
            .await?;
        tracing::info!(tab = %tab, added = ?repair.added, "header repaired");

        Ok(LocationsTab {
            rows,
            map: repair.map,
            header_repaired: true,
        })
    }

    /// Restore lookup-only attributes from the previous snapshot for records whose id and
    /// name still match. A cache read failure only costs the carry-over.
    async fn carry_over(&self, owner_id: &OwnerId, records: &mut [CanonicalRecord]) {
        let prior = match self.publisher.load_locations(owner_id).await {
            Ok(Some(snapshot)) => snapshot.data,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "could not load cached locations; skipping carry-over");
                return;
            }
        };
        let by_id: HashMap<&str, &CanonicalRecord> =
            prior.iter().map(|r| (r.id.as_str(), r)).collect();
        for record in records.iter_mut() {
            let Some(old) = by_id.get(record.id.as_str()) else {
                continue;
            };
            if old.name != record.name {
                continue;
            }
            if record.opening_hours.is_none() {
                record.opening_hours = old.opening_hours.clone();
            }
            if record.business_status.is_none() {
                record.business_status = old.business_status.clone();
            }
            if record.utc_offset_minutes.is_none() {
                record.utc_offset_minutes = old.utc_offset_minutes;
            }
            if record.lookup_attempted_at.is_none() {
                record.lookup_attempted_at = old.lookup_attempted_at;
            }
        }
    }
}

/// Row index of `id`. Positional ids are tried directly before scanning.
fn locate(records: &[CanonicalRecord], id: &str) -> Option<usize> {
    IdStrategy::positional_index(id)
        .filter(|i| records.get(*i).is_some_and(|r| r.id == id))
        .or_else(|| records.iter().position(|r| r.id == id))
}

#[async_trait]
impl TripSync for SyncEngine {
    #[tracing::instrument(
        level = "info",
        name = "tripsheet.sync_locations",
        skip(self),
        fields(owner_id = %source.owner_id)
    )]
    async fn sync_locations(&self, source: &SheetSource) -> Result<LocationSyncReport> {
        let _guard = self.guard(&source.owner_id).await;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        let tab = self.load_locations_tab(&source.spreadsheet_id).await?;
        let mut records = self.transform(&tab);
        self.carry_over(&source.owner_id, &mut records).await;

        let candidates = select_for_enrichment(&records, &tab.rows, &tab.map);
        let selected = candidates.len();

        let budget = EnrichmentBudget {
            max_items: self.config.enrich_max_items,
            soft_limit: self.config.enrich_budget(),
        };
        let executor =
            EnrichmentExecutor::new(self.places.as_ref(), &tab.map, &self.config.price, budget);
        let outcome = executor.run(records, &tab.rows, &candidates, clock).await;

        let cells_written = write_back(
            self.sheets.as_ref(),
            &source.spreadsheet_id,
            &self.config.locations_tab,
            &tab.map,
            &outcome.writes,
        )
        .await?;

        self.publisher
            .publish_locations(&source.owner_id, &source.spreadsheet_id, &outcome.records)
            .await?;

        let status = if outcome.remaining > 0 {
            SyncStatus::Partial
        } else {
            SyncStatus::Complete
        };
        tracing::info!(
            %run_id,
            records = outcome.records.len(),
            selected,
            processed = outcome.processed,
            remaining = outcome.remaining,
            failed = outcome.failed,
            cells_written,
            "locations synced"
        );

        Ok(LocationSyncReport {
            run_id,
            owner_id: source.owner_id.clone(),
            status,
            records: outcome.records,
            selected,
            processed: outcome.processed,
            remaining: outcome.remaining,
            failed: outcome.failed,
            cells_written,
            header_repaired: tab.header_repaired,
            started_at,
            finished_at: Utc::now(),
        })
    }

    #[tracing::instrument(
        level = "info",
        name = "tripsheet.update_location",
        skip(self, patch),
        fields(owner_id = %source.owner_id)
    )]
    async fn update_location(
        &self,
        source: &SheetSource,
        id: &str,
        patch: LocationPatch,
    ) -> Result<CanonicalRecord> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("location patch is empty".to_string()));
        }
        let _guard = self.guard(&source.owner_id).await;

        let tab = self.load_locations_tab(&source.spreadsheet_id).await?;
        let records = self.transform(&tab);
        let row_index = locate(&records, id)
            .ok_or_else(|| Error::NotFound(format!("location '{id}' not found")))?;

        let mut patch = patch;
        for (field, _) in patch.cells() {
            if !tab.map.is_resolved(field) {
                tracing::warn!(id, %field, "no column for patched field; dropping it");
                patch.clear(field);
            }
        }
        if patch.is_empty() {
            return Err(Error::InvalidInput(
                "no patched field has a column in the locations tab".to_string(),
            ));
        }

        let pending: Vec<PendingWrite> = patch
            .cells()
            .into_iter()
            .map(|(field, value)| PendingWrite {
                row_index,
                field,
                value,
            })
            .collect();
        write_back(
            self.sheets.as_ref(),
            &source.spreadsheet_id,
            &self.config.locations_tab,
            &tab.map,
            &pending,
        )
        .await?;

        // The photo cell holds a reference or a URL; the cache holds the URL.
        let mut cache_patch = patch;
        if let Some(cell) = cache_patch.photo_url.take() {
            let places = &self.places;
            cache_patch.photo_url = Some(photo_url(&cell, &|r: &str| places.photo_url_for(r)));
        }

        let mut record = records[row_index].clone();
        cache_patch.apply(&mut record, &self.config.price);

        let merged = self
            .publisher
            .merge_location(&source.owner_id, id, &cache_patch, &self.config.price)
            .await?;
        if !merged {
            tracing::info!(id, "location not cached yet; next sync publishes it");
        }
        Ok(record)
    }

    #[tracing::instrument(
        level = "info",
        name = "tripsheet.read_itinerary",
        skip(self),
        fields(owner_id = %source.owner_id)
    )]
    async fn read_itinerary(&self, source: &SheetSource) -> Result<Vec<ItineraryItem>> {
        itinerary::read_itinerary(
            self.sheets.as_ref(),
            &source.spreadsheet_id,
            &self.config.itinerary_tab,
        )
        .await
    }

    #[tracing::instrument(
        level = "info",
        name = "tripsheet.write_itinerary",
        skip(self, items),
        fields(owner_id = %source.owner_id, items = items.len())
    )]
    async fn write_itinerary(
        &self,
        source: &SheetSource,
        items: Vec<ItineraryItem>,
    ) -> Result<Vec<ItineraryItem>> {
        let _guard = self.guard(&source.owner_id).await;
        let items = itinerary::write_itinerary(
            self.sheets.as_ref(),
            &source.spreadsheet_id,
            &self.config.itinerary_tab,
            items,
        )
        .await?;
        self.publisher
            .publish_itinerary(&source.owner_id, &source.spreadsheet_id, &items)
            .await?;
        Ok(items)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn cached_locations(&self, owner_id: &OwnerId) -> Result<Vec<CanonicalRecord>> {
        Ok(self
            .publisher
            .load_locations(owner_id)
            .await?
            .map(|s| s.data)
            .unwrap_or_default())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn cached_itinerary(&self, owner_id: &OwnerId) -> Result<Vec<ItineraryItem>> {
        Ok(self
            .publisher
            .load_itinerary(owner_id)
            .await?
            .map(|s| s.data)
            .unwrap_or_default())
    }
}
