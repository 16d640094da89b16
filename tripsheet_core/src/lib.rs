//! Tripsheet core library: the spreadsheet sync engine, its collaborator traits and
//! the snapshot cache.

pub mod config;
pub mod error;
pub mod lookup;
pub mod models;
pub mod o11y;
pub mod sheets;
pub mod store;
pub mod sync;

pub use config::{StoreConfig, SyncConfig};
pub use error::{Error, Result};
pub use lookup::traits::{PlaceDetails, PlaceLookup};
pub use models::{OwnerId, SheetSource};
pub use sheets::traits::{RangeWrite, Spreadsheet, TabInfo};
pub use store::traits::{SnapshotKind, SnapshotStore, StoredSnapshot};
pub use sync::engine::SyncEngine;
pub use sync::models::{
    CachedSnapshot, CanonicalRecord, ColumnMap, ColumnRole, IdStrategy, ItineraryItem,
    LocationPatch, LocationSyncReport, PendingWrite, SyncStatus,
};
pub use sync::price::PriceRule;
pub use sync::traits::{SyncDeps, TripSync};
