use crate::models::OwnerId;
use crate::store::traits::{SnapshotKind, SnapshotStore, StoredSnapshot};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory SnapshotStore for local development and unit tests.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    rows: Arc<Mutex<HashMap<(OwnerId, SnapshotKind), StoredSnapshot>>>,
    fail_upserts: Arc<Mutex<Option<String>>>,
    upserts: Arc<Mutex<u64>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `upsert` fail with the given message (`None` restores).
    pub async fn fail_upserts(&self, message: Option<&str>) {
        *self.fail_upserts.lock().await = message.map(str::to_string);
    }

    /// Number of successful upserts (primarily for tests).
    pub async fn upsert_count(&self) -> u64 {
        *self.upserts.lock().await
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upsert(&self, kind: SnapshotKind, snapshot: &StoredSnapshot) -> Result<()> {
        if let Some(msg) = self.fail_upserts.lock().await.clone() {
            return Err(Error::BackendMessage(msg));
        }
        self.rows
            .lock()
            .await
            .insert((snapshot.owner_id.clone(), kind), snapshot.clone());
        *self.upserts.lock().await += 1;
        Ok(())
    }

    async fn get(&self, kind: SnapshotKind, owner_id: &OwnerId) -> Result<Option<StoredSnapshot>> {
        Ok(self
            .rows
            .lock()
            .await
            .get(&(owner_id.clone(), kind))
            .cloned())
    }
}
