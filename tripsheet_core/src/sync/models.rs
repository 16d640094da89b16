use crate::models::OwnerId;
use crate::sync::price::PriceRule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Semantic field of a locations row, independent of its physical column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnRole {
    Name,
    City,
    Type,
    Price,
    Description,
    Url,
    Lat,
    Lng,
    PhotoRef,
}

impl ColumnRole {
    /// All roles in legacy column order.
    pub const ALL: [ColumnRole; 9] = [
        ColumnRole::Name,
        ColumnRole::City,
        ColumnRole::Type,
        ColumnRole::Price,
        ColumnRole::Description,
        ColumnRole::Url,
        ColumnRole::Lat,
        ColumnRole::Lng,
        ColumnRole::PhotoRef,
    ];

    /// Roles that header repair appends when nothing else resolves them.
    pub const REPAIRABLE: [ColumnRole; 3] = [ColumnRole::Lat, ColumnRole::Lng, ColumnRole::PhotoRef];

    /// Position in the legacy nine-column layout.
    pub fn legacy_index(self) -> usize {
        self as usize
    }

    /// Accepted header texts, already lowercased and trimmed.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Name => &["name", "restaurant name", "place name", "place"],
            Self::City => &["city", "area", "town"],
            Self::Type => &["type", "category", "cuisine"],
            Self::Price => &["price", "price range", "cost", "budget"],
            Self::Description => &["description", "summary", "notes", "note"],
            Self::Url => &["url", "link", "maps url", "google maps url", "google maps link"],
            Self::Lat => &["lat", "latitude"],
            Self::Lng => &["lng", "lon", "long", "longitude"],
            Self::PhotoRef => &["photo reference", "photo ref", "photoref", "photo", "photo url"],
        }
    }

    /// Header text written by header repair.
    pub fn header_label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::City => "City",
            Self::Type => "Type",
            Self::Price => "Price",
            Self::Description => "Description",
            Self::Url => "URL",
            Self::Lat => "Latitude",
            Self::Lng => "Longitude",
            Self::PhotoRef => "Photo Reference",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::City => "city",
            Self::Type => "type",
            Self::Price => "price",
            Self::Description => "description",
            Self::Url => "url",
            Self::Lat => "lat",
            Self::Lng => "lng",
            Self::PhotoRef => "photoRef",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role → zero-based column index. `None` means unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnMap {
    slots: [Option<usize>; 9],
}

impl ColumnMap {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        self.slots[role as usize]
    }

    pub fn set(&mut self, role: ColumnRole, index: usize) {
        self.slots[role as usize] = Some(index);
    }

    pub fn is_resolved(&self, role: ColumnRole) -> bool {
        self.get(role).is_some()
    }

    pub fn unresolved(&self) -> Vec<ColumnRole> {
        ColumnRole::ALL
            .into_iter()
            .filter(|r| !self.is_resolved(*r))
            .collect()
    }

    /// Whether some role already points at `index`.
    pub fn claims(&self, index: usize) -> bool {
        self.slots.contains(&Some(index))
    }

    /// The legacy nine-column layout.
    pub fn legacy() -> Self {
        let mut map = Self::default();
        for role in ColumnRole::ALL {
            map.set(role, role.legacy_index());
        }
        map
    }

    /// Cell text for `role` in a raw row (empty when unresolved or out of range).
    pub fn cell<'a>(&self, row: &'a [String], role: ColumnRole) -> &'a str {
        self.get(role)
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

/// How record ids are derived.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// `loc-{data row index}`. Shifts when rows are inserted, deleted, or reordered.
    #[default]
    Positional,
    /// `loc-{hash(name, city)}`. Survives reordering; duplicates get `-2`, `-3`, ...
    ContentHash,
}

impl IdStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" | "position" => Some(Self::Positional),
            "content_hash" | "content-hash" | "hash" => Some(Self::ContentHash),
            _ => None,
        }
    }

    /// Base id before duplicate disambiguation.
    pub fn base_id(self, index: usize, name: &str, city: &str) -> String {
        match self {
            Self::Positional => format!("loc-{index}"),
            Self::ContentHash => {
                let mut h = Sha256::new();
                h.update(name.trim().to_lowercase().as_bytes());
                h.update(b"|");
                h.update(city.trim().to_lowercase().as_bytes());
                let digest = h.finalize();
                let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
                format!("loc-{hex}")
            }
        }
    }

    /// Row index encoded in a positional id.
    pub fn positional_index(id: &str) -> Option<usize> {
        id.strip_prefix("loc-")?.parse::<usize>().ok()
    }
}

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_CITY: &str = "Japan";
pub const DEFAULT_TYPE: &str = "Spot";
pub const DEFAULT_PRICE: &str = "-";
pub const DEFAULT_URL: &str = "#";

/// Normalized in-memory form of one locations row; also the cached shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub id: String,
    pub name: String,
    pub city: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price_local: String,
    pub price_converted: String,
    pub description: String,
    pub maps_url: String,
    pub lat: f64,
    pub lng: f64,
    pub photo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
    /// Start of the last sync that ran a lookup for this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_attempted_at: Option<DateTime<Utc>>,
}

impl CanonicalRecord {
    pub fn has_name(&self) -> bool {
        self.name != DEFAULT_NAME
    }

    pub fn has_coordinates(&self) -> bool {
        self.lat != 0.0 && self.lng != 0.0
    }

    /// Lookup query sent to the place provider.
    pub fn lookup_query(&self) -> String {
        if self.city.trim().is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.city)
        }
    }
}

/// One changed cell awaiting write-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWrite {
    /// Zero-based data row index (header excluded).
    pub row_index: usize,
    pub field: ColumnRole,
    pub value: String,
}

/// One row of the day plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItem {
    pub day: String,
    pub location_id: String,
    pub order: i64,
    #[serde(default)]
    pub note: String,
}

/// Typed view of a cached snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSnapshot<T> {
    pub owner_id: OwnerId,
    pub source_id: String,
    pub data: Vec<T>,
    pub updated_at: DateTime<Utc>,
}

/// Field-level edit for a single location. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    pub name: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub price_local: Option<String>,
    pub description: Option<String>,
    pub maps_url: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Written to the photo-reference column verbatim (a URL there is a user override).
    pub photo_url: Option<String>,
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        self.cells().is_empty()
    }

    /// Changed cells in legacy column order.
    pub fn cells(&self) -> Vec<(ColumnRole, String)> {
        let mut out = Vec::new();
        let mut push = |role: ColumnRole, v: Option<String>| {
            if let Some(v) = v {
                out.push((role, v));
            }
        };
        push(ColumnRole::Name, self.name.clone());
        push(ColumnRole::City, self.city.clone());
        push(ColumnRole::Type, self.kind.clone());
        push(ColumnRole::Price, self.price_local.clone());
        push(ColumnRole::Description, self.description.clone());
        push(ColumnRole::Url, self.maps_url.clone());
        push(ColumnRole::Lat, self.lat.map(|v| v.to_string()));
        push(ColumnRole::Lng, self.lng.map(|v| v.to_string()));
        push(ColumnRole::PhotoRef, self.photo_url.clone());
        out
    }

    /// Drop the edit for `role`.
    pub fn clear(&mut self, role: ColumnRole) {
        match role {
            ColumnRole::Name => self.name = None,
            ColumnRole::City => self.city = None,
            ColumnRole::Type => self.kind = None,
            ColumnRole::Price => self.price_local = None,
            ColumnRole::Description => self.description = None,
            ColumnRole::Url => self.maps_url = None,
            ColumnRole::Lat => self.lat = None,
            ColumnRole::Lng => self.lng = None,
            ColumnRole::PhotoRef => self.photo_url = None,
        }
    }

    /// Shallow merge into an existing record.
    pub fn apply(&self, record: &mut CanonicalRecord, price: &PriceRule) {
        if let Some(v) = &self.name {
            record.name = v.clone();
        }
        if let Some(v) = &self.city {
            record.city = v.clone();
        }
        if let Some(v) = &self.kind {
            record.kind = v.clone();
        }
        if let Some(v) = &self.price_local {
            record.price_local = v.clone();
            record.price_converted = price.convert(v);
        }
        if let Some(v) = &self.description {
            record.description = v.clone();
        }
        if let Some(v) = &self.maps_url {
            record.maps_url = v.clone();
        }
        if let Some(v) = self.lat {
            record.lat = v;
        }
        if let Some(v) = self.lng {
            record.lng = v;
        }
        if let Some(v) = &self.photo_url {
            record.photo_url = v.clone();
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Every selected record was attempted.
    Complete,
    /// The time budget or item cap stopped enrichment early; re-invoke to continue.
    Partial,
}

/// Result of one locations sync invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSyncReport {
    pub run_id: Uuid,
    pub owner_id: OwnerId,
    pub status: SyncStatus,
    pub records: Vec<CanonicalRecord>,
    /// Records selected for enrichment.
    pub selected: usize,
    /// Lookups attempted (successful or not).
    pub processed: usize,
    pub remaining: usize,
    /// Lookups that errored or found nothing.
    pub failed: usize,
    pub cells_written: usize,
    pub header_repaired: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
