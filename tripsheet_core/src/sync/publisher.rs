//! Cache snapshot publishing.
//!
//! Locations and itinerary are separate buckets keyed by owner. A sync replaces the whole
//! bucket; a single-record edit merges into the cached record in place.

use crate::models::OwnerId;
use crate::store::traits::{SnapshotKind, SnapshotStore, StoredSnapshot};
use crate::sync::models::{CachedSnapshot, CanonicalRecord, ItineraryItem, LocationPatch};
use crate::sync::price::PriceRule;
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Clone)]
pub struct CachePublisher {
    store: Arc<dyn SnapshotStore>,
}

impl CachePublisher {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(level = "debug", skip(self, data), fields(items = data.len()))]
    async fn publish<T: Serialize + Sync>(
        &self,
        kind: SnapshotKind,
        owner_id: &OwnerId,
        source_id: &str,
        data: &[T],
    ) -> Result<()> {
        let data = serde_json::to_value(data)
            .map_err(|e| Error::backend(format!("serialize {kind} snapshot"), e))?;
        let snapshot = StoredSnapshot {
            owner_id: owner_id.clone(),
            source_id: source_id.to_string(),
            data,
            updated_at: Utc::now(),
        };
        self.store.upsert(kind, &snapshot).await
    }

    async fn load<T: DeserializeOwned>(
        &self,
        kind: SnapshotKind,
        owner_id: &OwnerId,
    ) -> Result<Option<CachedSnapshot<T>>> {
        let Some(row) = self.store.get(kind, owner_id).await? else {
            return Ok(None);
        };
        let data: Vec<T> = serde_json::from_value(row.data)
            .map_err(|e| Error::backend(format!("decode {kind} snapshot"), e))?;
        Ok(Some(CachedSnapshot {
            owner_id: row.owner_id,
            source_id: row.source_id,
            data,
            updated_at: row.updated_at,
        }))
    }

    /// Replace the owner's locations snapshot.
    pub async fn publish_locations(
        &self,
        owner_id: &OwnerId,
        source_id: &str,
        records: &[CanonicalRecord],
    ) -> Result<()> {
        self.publish(SnapshotKind::Locations, owner_id, source_id, records)
            .await
    }

    /// Replace the owner's itinerary snapshot. An empty list is still published.
    pub async fn publish_itinerary(
        &self,
        owner_id: &OwnerId,
        source_id: &str,
        items: &[ItineraryItem],
    ) -> Result<()> {
        self.publish(SnapshotKind::Itinerary, owner_id, source_id, items)
            .await
    }

    /// Apply `patch` to the cached record `id`.
    ///
    /// Returns `false` when there is no snapshot or the record is not cached; the next
    /// full sync picks the change up.
    #[tracing::instrument(level = "debug", skip(self, patch, price))]
    pub async fn merge_location(
        &self,
        owner_id: &OwnerId,
        id: &str,
        patch: &LocationPatch,
        price: &PriceRule,
    ) -> Result<bool> {
        let Some(mut snapshot) = self.load_locations(owner_id).await? else {
            return Ok(false);
        };
        let Some(record) = snapshot.data.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        patch.apply(record, price);
        self.publish_locations(owner_id, &snapshot.source_id, &snapshot.data)
            .await?;
        Ok(true)
    }

    pub async fn load_locations(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<CachedSnapshot<CanonicalRecord>>> {
        self.load(SnapshotKind::Locations, owner_id).await
    }

    pub async fn load_itinerary(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<CachedSnapshot<ItineraryItem>>> {
        self.load(SnapshotKind::Itinerary, owner_id).await
    }
}
