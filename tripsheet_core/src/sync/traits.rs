use crate::Result;
use crate::lookup::traits::PlaceLookup;
use crate::models::{OwnerId, SheetSource};
use crate::sheets::traits::Spreadsheet;
use crate::store::traits::SnapshotStore;
use crate::sync::models::{CanonicalRecord, ItineraryItem, LocationPatch, LocationSyncReport};
use async_trait::async_trait;
use std::sync::Arc;

/// Spreadsheet ⇄ cache reconciliation for one owner's trip.
#[async_trait]
pub trait TripSync: Send + Sync {
    /// Full locations pipeline: resolve, transform, enrich within budget, write back,
    /// publish. A `Partial` report means the caller should invoke again.
    async fn sync_locations(&self, source: &SheetSource) -> Result<LocationSyncReport>;

    /// Edit one record in the spreadsheet and merge the edit into the cache.
    async fn update_location(
        &self,
        source: &SheetSource,
        id: &str,
        patch: LocationPatch,
    ) -> Result<CanonicalRecord>;

    /// Read the day plan, creating the tab when it does not exist.
    async fn read_itinerary(&self, source: &SheetSource) -> Result<Vec<ItineraryItem>>;

    /// Replace the day plan with `items` sorted, and mirror it into the cache.
    async fn write_itinerary(
        &self,
        source: &SheetSource,
        items: Vec<ItineraryItem>,
    ) -> Result<Vec<ItineraryItem>>;

    async fn cached_locations(&self, owner_id: &OwnerId) -> Result<Vec<CanonicalRecord>>;

    async fn cached_itinerary(&self, owner_id: &OwnerId) -> Result<Vec<ItineraryItem>>;
}

/// Collaborators required by `SyncEngine`.
#[derive(Clone)]
pub struct SyncDeps {
    pub sheets: Arc<dyn Spreadsheet>,
    pub places: Arc<dyn PlaceLookup>,
    pub store: Arc<dyn SnapshotStore>,
}
