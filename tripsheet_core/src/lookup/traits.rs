use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a place lookup returns for a free-text query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub photo_ref: Option<String>,
    pub maps_url: Option<String>,
    /// Provider price tier, 0 (free) to 4.
    pub price_level: Option<u8>,
    pub place_type: Option<String>,
    pub summary: Option<String>,
    pub opening_hours: Option<Vec<String>>,
    pub business_status: Option<String>,
    pub utc_offset_minutes: Option<i32>,
}

/// External place-lookup provider.
///
/// Implementations must not retry internally in a way that blows the caller's time budget;
/// the engine calls `lookup` strictly one at a time.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// `Ok(None)` when the provider has no match.
    async fn lookup(&self, query: &str) -> Result<Option<PlaceDetails>>;

    /// Absolute URL for a provider photo reference.
    fn photo_url_for(&self, photo_ref: &str) -> String;
}
