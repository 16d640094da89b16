//! SQLite-backed SnapshotStore.
//!
//! One WAL-mode file, one row per (owner_id, kind). Upserts replace the row wholesale
//! in a single statement, so a failed upsert never leaves a partial snapshot behind.
//!
//! Usage:
//! ```ignore
//! let store = SqliteSnapshotStore::new("./data/tripsheet_cache.db").await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use crate::models::OwnerId;
use crate::store::traits::{SnapshotKind, SnapshotStore, StoredSnapshot};
use crate::{Error, Result};

#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    owner_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    source_id TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (owner_id, kind)
);
"#;

impl SqliteSnapshotStore {
    /// Create (or open) the cache database at `path`.
    ///
    /// Creates parent directories and runs the schema migration on startup.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::backend("sqlite_snapshot_store", e))?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", path.display()))
            .map_err(|e| Error::backend("sqlite_snapshot_store", e))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| Error::backend("sqlite_snapshot_store", e))?;

        Self::migrate(pool).await
    }

    /// Private in-memory database; a single connection keeps it alive.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::backend("sqlite_snapshot_store", e))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| Error::backend("sqlite_snapshot_store", e))?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| Error::backend("sqlite_snapshot_store_migration", e))?;
        Ok(Self { pool })
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::backend("sqlite_snapshot_store", e)
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    #[tracing::instrument(level = "debug", skip(self, snapshot), fields(owner_id = %snapshot.owner_id))]
    async fn upsert(&self, kind: SnapshotKind, snapshot: &StoredSnapshot) -> Result<()> {
        let data = serde_json::to_string(&snapshot.data)
            .map_err(|e| Error::backend("serialize snapshot data", e))?;
        sqlx::query(
            "INSERT INTO snapshots (owner_id, kind, source_id, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(owner_id, kind) DO UPDATE SET
               source_id = excluded.source_id,
               data = excluded.data,
               updated_at = excluded.updated_at",
        )
        .bind(snapshot.owner_id.as_str())
        .bind(kind.as_str())
        .bind(&snapshot.source_id)
        .bind(data)
        .bind(snapshot.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(&self, kind: SnapshotKind, owner_id: &OwnerId) -> Result<Option<StoredSnapshot>> {
        let row = sqlx::query(
            "SELECT owner_id, source_id, data, updated_at
             FROM snapshots WHERE owner_id = ?1 AND kind = ?2",
        )
        .bind(owner_id.as_str())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let data: String = row.get("data");
        let updated_at: String = row.get("updated_at");
        let owner: String = row.get("owner_id");
        Ok(Some(StoredSnapshot {
            owner_id: OwnerId::new(owner)?,
            source_id: row.get("source_id"),
            data: serde_json::from_str(&data)
                .map_err(|e| Error::backend("deserialize snapshot data", e))?,
            updated_at: DateTime::parse_from_rfc3339(&updated_at)
                .map_err(|e| Error::backend("parse snapshot updated_at", e))?
                .with_timezone(&Utc),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(owner: &str, data: serde_json::Value) -> StoredSnapshot {
        StoredSnapshot {
            owner_id: OwnerId::new(owner).unwrap(),
            source_id: "sheet-1".to_string(),
            data,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_per_owner_and_kind() {
        let store = SqliteSnapshotStore::in_memory().await.unwrap();
        let owner = OwnerId::new("u1").unwrap();

        store
            .upsert(SnapshotKind::Locations, &snapshot("u1", serde_json::json!([{"id": "loc-0"}])))
            .await
            .unwrap();
        store
            .upsert(SnapshotKind::Itinerary, &snapshot("u1", serde_json::json!([])))
            .await
            .unwrap();
        store
            .upsert(SnapshotKind::Locations, &snapshot("u1", serde_json::json!([{"id": "loc-9"}])))
            .await
            .unwrap();

        let loc = store.get(SnapshotKind::Locations, &owner).await.unwrap().unwrap();
        assert_eq!(loc.data, serde_json::json!([{"id": "loc-9"}]));
        let it = store.get(SnapshotKind::Itinerary, &owner).await.unwrap().unwrap();
        assert_eq!(it.data, serde_json::json!([]));

        let other = OwnerId::new("u2").unwrap();
        assert!(store.get(SnapshotKind::Locations, &other).await.unwrap().is_none());
    }
}
