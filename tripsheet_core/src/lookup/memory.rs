use crate::lookup::traits::{PlaceDetails, PlaceLookup};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned place lookup keyed by exact query string.
///
/// Queries listed in `failing` return a backend error; unknown queries return `None`.
/// An optional per-call delay (tokio time) exercises the enrichment time budget.
#[derive(Clone, Default)]
pub struct StaticPlaceLookup {
    places: HashMap<String, PlaceDetails>,
    failing: Vec<String>,
    delay: Option<Duration>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StaticPlaceLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, query: impl Into<String>, details: PlaceDetails) -> Self {
        self.places.insert(query.into(), details);
        self
    }

    pub fn with_failure(mut self, query: impl Into<String>) -> Self {
        self.failing.push(query.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PlaceLookup for StaticPlaceLookup {
    async fn lookup(&self, query: &str) -> Result<Option<PlaceDetails>> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.iter().any(|q| q == query) {
            return Err(Error::BackendMessage(format!("lookup failed for '{query}'")));
        }
        Ok(self.places.get(query).cloned())
    }

    fn photo_url_for(&self, photo_ref: &str) -> String {
        format!("https://photos.example/{photo_ref}")
    }
}
