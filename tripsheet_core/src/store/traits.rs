use crate::models::OwnerId;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache bucket. Locations and itinerary snapshots are stored independently.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Locations,
    Itinerary,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locations => "locations",
            Self::Itinerary => "itinerary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "locations" => Some(Self::Locations),
            "itinerary" => Some(Self::Itinerary),
            _ => None,
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized cache row. `data` is the JSON array of records for the bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub owner_id: OwnerId,
    pub source_id: String,
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert or wholesale replace the snapshot for `(snapshot.owner_id, kind)`.
    async fn upsert(&self, kind: SnapshotKind, snapshot: &StoredSnapshot) -> Result<()>;

    async fn get(&self, kind: SnapshotKind, owner_id: &OwnerId) -> Result<Option<StoredSnapshot>>;
}
