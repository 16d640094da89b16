//! Google Places adapter.
//!
//! A lookup is a Text Search for the best match, then a Details call for the fields the
//! search response lacks (maps URL, summary, opening hours, status, UTC offset).
//! A failed Details call degrades to the search result.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;
use tripsheet_core::{Error, PlaceDetails, PlaceLookup, Result};

const DEFAULT_API_BASE: &str = "https://maps.googleapis.com/maps/api/place";
const PHOTO_MAX_WIDTH: u32 = 800;
const DETAILS_FIELDS: &str = "url,editorial_summary,opening_hours,business_status,utc_offset";

/// Place types too generic to describe a location.
const GENERIC_TYPES: &[&str] = &["point_of_interest", "establishment", "premise", "political"];

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<SearchHit>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    place_id: Option<String>,
    #[serde(default)]
    name: String,
    geometry: Option<Geometry>,
    #[serde(default)]
    photos: Vec<Photo>,
    price_level: Option<u8>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<DetailsResult>,
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailsResult {
    url: Option<String>,
    editorial_summary: Option<EditorialSummary>,
    opening_hours: Option<OpeningHours>,
    business_status: Option<String>,
    utc_offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct EditorialSummary {
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    #[serde(default)]
    weekday_text: Vec<String>,
}

#[derive(Clone)]
pub struct GooglePlacesClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("google places api key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let base = format!("{}/{}", self.api_base.trim_end_matches('/'), path);
        let mut url =
            Url::parse(&base).map_err(|e| Error::backend("parse google places url", e))?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn text_search(&self, query: &str) -> Result<Option<SearchHit>> {
        let url = self.endpoint("textsearch/json", &[("query", query)])?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Error::backend_reqwest)?;
        let body: TextSearchResponse = resp.json().await.map_err(Error::backend_reqwest)?;
        check_status(&body.status, body.error_message.as_deref())?;
        Ok(body.results.into_iter().next())
    }

    async fn details(&self, place_id: &str) -> Result<DetailsResult> {
        let url = self.endpoint(
            "details/json",
            &[("place_id", place_id), ("fields", DETAILS_FIELDS)],
        )?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Error::backend_reqwest)?;
        let body: DetailsResponse = resp.json().await.map_err(Error::backend_reqwest)?;
        check_status(&body.status, body.error_message.as_deref())?;
        Ok(body.result.unwrap_or_default())
    }
}

/// `OK` and `ZERO_RESULTS` are successes; everything else is an error.
fn check_status(status: &str, message: Option<&str>) -> Result<()> {
    let message = message.unwrap_or("");
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "REQUEST_DENIED" => Err(Error::Unauthorized(format!(
            "google places request denied: {message}"
        ))),
        "INVALID_REQUEST" => Err(Error::InvalidInput(format!(
            "google places invalid request: {message}"
        ))),
        other => Err(Error::BackendMessage(format!(
            "google places status {other}: {message}"
        ))),
    }
}

/// `"ramen_restaurant"` → `"Ramen restaurant"`; generic types are skipped.
fn display_type(types: &[String]) -> Option<String> {
    let t = types
        .iter()
        .find(|t| !GENERIC_TYPES.contains(&t.as_str()))?;
    let words = t.replace('_', " ");
    let mut chars = words.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

fn place_details(hit: SearchHit, details: DetailsResult) -> PlaceDetails {
    let (lat, lng) = hit
        .geometry
        .map(|g| (g.location.lat, g.location.lng))
        .unwrap_or((0.0, 0.0));
    PlaceDetails {
        name: hit.name,
        lat,
        lng,
        photo_ref: hit.photos.into_iter().next().map(|p| p.photo_reference),
        maps_url: details.url,
        price_level: hit.price_level,
        place_type: display_type(&hit.types),
        summary: details.editorial_summary.and_then(|s| s.overview),
        opening_hours: details
            .opening_hours
            .map(|o| o.weekday_text)
            .filter(|w| !w.is_empty()),
        business_status: details.business_status,
        utc_offset_minutes: details.utc_offset,
    }
}

#[async_trait]
impl PlaceLookup for GooglePlacesClient {
    #[instrument(level = "info", skip(self))]
    async fn lookup(&self, query: &str) -> Result<Option<PlaceDetails>> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        let Some(hit) = self.text_search(query).await? else {
            return Ok(None);
        };
        let details = match hit.place_id.as_deref() {
            Some(place_id) => match self.details(place_id).await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(error = %e, place_id, "place details failed; using search result");
                    DetailsResult::default()
                }
            },
            None => DetailsResult::default(),
        };
        Ok(Some(place_details(hit, details)))
    }

    fn photo_url_for(&self, photo_ref: &str) -> String {
        match self.endpoint(
            "photo",
            &[
                ("maxwidth", PHOTO_MAX_WIDTH.to_string().as_str()),
                ("photo_reference", photo_ref),
            ],
        ) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "could not build photo url");
                String::new()
            }
        }
    }
}
