//! Time-budgeted enrichment.
//!
//! Lookups run strictly one at a time. Before each item the executor checks the item cap
//! and the wall-clock budget measured from the start of the invocation; once either is hit
//! it halts and reports what is left. In-flight lookups are never interrupted.

use crate::lookup::traits::{PlaceDetails, PlaceLookup};
use crate::sync::models::{
    CanonicalRecord, ColumnMap, ColumnRole, DEFAULT_PRICE, DEFAULT_TYPE, DEFAULT_URL,
    PendingWrite,
};
use crate::sync::price::PriceRule;
use crate::sync::selector::EnrichmentCandidate;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Limits for one enrichment pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EnrichmentBudget {
    pub max_items: usize,
    /// Soft wall-clock threshold, measured from the invocation start.
    pub soft_limit: Duration,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    ItemCap,
    TimeBudget,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ExecutorState {
    Running,
    Halted(HaltReason),
}

/// Terminal output of the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome {
    /// All records, with enrichment applied in place.
    pub records: Vec<CanonicalRecord>,
    /// Changed cells, in processing order.
    pub writes: Vec<PendingWrite>,
    pub processed: usize,
    pub remaining: usize,
    pub failed: usize,
    /// `None` when every candidate was attempted.
    pub halted: Option<HaltReason>,
}

pub struct EnrichmentExecutor<'a> {
    lookup: &'a dyn PlaceLookup,
    map: &'a ColumnMap,
    price: &'a PriceRule,
    budget: EnrichmentBudget,
}

impl<'a> EnrichmentExecutor<'a> {
    pub fn new(
        lookup: &'a dyn PlaceLookup,
        map: &'a ColumnMap,
        price: &'a PriceRule,
        budget: EnrichmentBudget,
    ) -> Self {
        Self {
            lookup,
            map,
            price,
            budget,
        }
    }

    fn next_state(&self, processed: usize, started: Instant) -> ExecutorState {
        if processed >= self.budget.max_items {
            ExecutorState::Halted(HaltReason::ItemCap)
        } else if started.elapsed() >= self.budget.soft_limit {
            ExecutorState::Halted(HaltReason::TimeBudget)
        } else {
            ExecutorState::Running
        }
    }

    #[tracing::instrument(
        level = "info",
        name = "tripsheet.enrich",
        skip_all,
        fields(candidates = candidates.len(), max_items = self.budget.max_items)
    )]
    pub async fn run(
        &self,
        mut records: Vec<CanonicalRecord>,
        rows: &[Vec<String>],
        candidates: &[EnrichmentCandidate],
        started: Instant,
    ) -> EnrichmentOutcome {
        let mut writes = Vec::new();
        let mut processed = 0usize;
        let mut failed = 0usize;
        let mut halted = None;
        let attempted_at = Utc::now();

        for candidate in candidates {
            if let ExecutorState::Halted(reason) = self.next_state(processed, started) {
                halted = Some(reason);
                break;
            }
            processed += 1;

            let Some(record) = records.get_mut(candidate.row_index) else {
                failed += 1;
                continue;
            };
            record.lookup_attempted_at = Some(attempted_at);
            let query = record.lookup_query();

            let details = match self.lookup.lookup(&query).await {
                Ok(Some(details)) => details,
                Ok(None) => {
                    tracing::warn!(id = %record.id, %query, "place lookup found nothing; skipping");
                    failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(id = %record.id, %query, error = %e, "place lookup failed; skipping");
                    failed += 1;
                    continue;
                }
            };

            let raw = rows
                .get(candidate.row_index)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let changes = merge_details(record, raw, self.map, &details, self.price, self.lookup);
            writes.extend(changes.into_iter().map(|(field, value)| PendingWrite {
                row_index: candidate.row_index,
                field,
                value,
            }));
        }

        let remaining = candidates.len() - processed;
        if let Some(reason) = halted {
            tracing::info!(?reason, processed, remaining, "enrichment halted");
        }

        EnrichmentOutcome {
            records,
            writes,
            processed,
            remaining,
            failed,
            halted,
        }
    }
}

/// Fill-only merge of lookup details into a record.
///
/// Returns the spreadsheet cells that changed. Filled fields are never replaced, including a
/// photo cell that already holds a reference or a URL.
pub fn merge_details(
    record: &mut CanonicalRecord,
    raw: &[String],
    map: &ColumnMap,
    details: &PlaceDetails,
    price: &PriceRule,
    lookup: &dyn PlaceLookup,
) -> Vec<(ColumnRole, String)> {
    let mut changes = Vec::new();

    if record.lat == 0.0 && details.lat != 0.0 {
        record.lat = details.lat;
        changes.push((ColumnRole::Lat, details.lat.to_string()));
    }
    if record.lng == 0.0 && details.lng != 0.0 {
        record.lng = details.lng;
        changes.push((ColumnRole::Lng, details.lng.to_string()));
    }

    if let Some(photo_ref) = non_blank(details.photo_ref.as_deref()) {
        if map.cell(raw, ColumnRole::PhotoRef).is_empty() {
            record.photo_url = lookup.photo_url_for(photo_ref);
            changes.push((ColumnRole::PhotoRef, photo_ref.to_string()));
        }
    }

    if record.kind == DEFAULT_TYPE {
        if let Some(kind) = non_blank(details.place_type.as_deref()) {
            record.kind = kind.to_string();
            changes.push((ColumnRole::Type, record.kind.clone()));
        }
    }

    if record.price_local == DEFAULT_PRICE {
        if let Some(level) = details.price_level {
            record.price_local = price.from_level(level);
            record.price_converted = price.convert(&record.price_local);
            changes.push((ColumnRole::Price, record.price_local.clone()));
        }
    }

    if record.description.trim().is_empty() {
        if let Some(summary) = non_blank(details.summary.as_deref()) {
            record.description = summary.to_string();
            changes.push((ColumnRole::Description, record.description.clone()));
        }
    }

    if record.maps_url == DEFAULT_URL {
        if let Some(url) = non_blank(details.maps_url.as_deref()) {
            record.maps_url = url.to_string();
            changes.push((ColumnRole::Url, record.maps_url.clone()));
        }
    }

    // Lookup-only attributes: no column, cache only.
    if record.opening_hours.is_none() {
        record.opening_hours = details.opening_hours.clone();
    }
    if record.business_status.is_none() {
        record.business_status = details.business_status.clone();
    }
    if record.utc_offset_minutes.is_none() {
        record.utc_offset_minutes = details.utc_offset_minutes;
    }

    changes
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::memory::StaticPlaceLookup;
    use crate::sync::models::IdStrategy;
    use crate::sync::selector::select_for_enrichment;
    use crate::sync::transform::transform_rows;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn details(name: &str) -> PlaceDetails {
        PlaceDetails {
            name: name.to_string(),
            lat: 35.0,
            lng: 135.0,
            photo_ref: Some(format!("ref-{name}")),
            maps_url: Some(format!("https://maps/{name}")),
            price_level: Some(2),
            place_type: Some("Restaurant".to_string()),
            summary: Some("Good food".to_string()),
            opening_hours: Some(vec!["Mon: 11-22".to_string()]),
            business_status: Some("OPERATIONAL".to_string()),
            utc_offset_minutes: Some(540),
        }
    }

    struct Fixture {
        rows: Vec<Vec<String>>,
        records: Vec<CanonicalRecord>,
        candidates: Vec<EnrichmentCandidate>,
        map: ColumnMap,
        price: PriceRule,
    }

    fn fixture(lookup: &StaticPlaceLookup, data: &[&[&str]]) -> Fixture {
        let rows = rows(data);
        let map = ColumnMap::legacy();
        let price = PriceRule::default();
        let records = transform_rows(&rows, &map, IdStrategy::Positional, &price, &|r: &str| {
            lookup.photo_url_for(r)
        });
        let candidates = select_for_enrichment(&records, &rows, &map);
        Fixture {
            rows,
            records,
            candidates,
            map,
            price,
        }
    }

    fn budget(max_items: usize, secs: u64) -> EnrichmentBudget {
        EnrichmentBudget {
            max_items,
            soft_limit: Duration::from_secs(secs),
        }
    }

    #[tokio::test]
    async fn fills_only_missing_fields() {
        let lookup = StaticPlaceLookup::new().with_place("Ichiran Tokyo", details("a"));
        let f = fixture(
            &lookup,
            &[&["Ichiran", "Tokyo", "Ramen", "¥", "", "#", "", "", ""]],
        );
        let exec = EnrichmentExecutor::new(&lookup, &f.map, &f.price, budget(3, 60));
        let out = exec
            .run(f.records.clone(), &f.rows, &f.candidates, Instant::now())
            .await;

        let r = &out.records[0];
        assert_eq!(r.kind, "Ramen");
        assert_eq!(r.price_local, "¥");
        assert_eq!(r.description, "Good food");
        assert_eq!(r.maps_url, "https://maps/a");
        assert_eq!((r.lat, r.lng), (35.0, 135.0));
        assert_eq!(r.photo_url, "https://photos.example/ref-a");
        assert_eq!(r.utc_offset_minutes, Some(540));

        let fields: Vec<ColumnRole> = out.writes.iter().map(|w| w.field).collect();
        assert_eq!(
            fields,
            vec![
                ColumnRole::Lat,
                ColumnRole::Lng,
                ColumnRole::PhotoRef,
                ColumnRole::Description,
                ColumnRole::Url
            ]
        );
        assert!(out.writes.iter().all(|w| w.row_index == 0));
        assert_eq!((out.processed, out.remaining, out.failed), (1, 0, 0));
        assert_eq!(out.halted, None);
    }

    #[tokio::test]
    async fn user_photo_override_is_never_replaced() {
        let lookup = StaticPlaceLookup::new().with_place("Ichiran Tokyo", details("a"));
        let f = fixture(
            &lookup,
            &[&["Ichiran", "Tokyo", "", "", "", "", "", "", "https://me/p.jpg"]],
        );
        let exec = EnrichmentExecutor::new(&lookup, &f.map, &f.price, budget(3, 60));
        let out = exec
            .run(f.records.clone(), &f.rows, &f.candidates, Instant::now())
            .await;
        assert_eq!(out.records[0].photo_url, "https://me/p.jpg");
        assert!(out.writes.iter().all(|w| w.field != ColumnRole::PhotoRef));
    }

    #[tokio::test]
    async fn existing_photo_reference_is_kept() {
        let lookup = StaticPlaceLookup::new().with_place("Ichiran Tokyo", details("a"));
        let f = fixture(&lookup, &[&["Ichiran", "Tokyo", "", "", "", "", "", "", "old-ref"]]);
        let exec = EnrichmentExecutor::new(&lookup, &f.map, &f.price, budget(3, 60));
        let out = exec
            .run(f.records.clone(), &f.rows, &f.candidates, Instant::now())
            .await;
        assert_eq!(out.records[0].photo_url, "https://photos.example/old-ref");
        assert!(out.writes.iter().all(|w| w.field != ColumnRole::PhotoRef));
        assert!(out.writes.iter().any(|w| w.field == ColumnRole::Description));
    }

    #[tokio::test]
    async fn failures_are_skipped_and_counted() {
        let lookup = StaticPlaceLookup::new()
            .with_failure("A Tokyo")
            .with_place("C Tokyo", details("c"));
        let f = fixture(
            &lookup,
            &[&["A", "Tokyo"], &["B", "Tokyo"], &["C", "Tokyo"]],
        );
        let exec = EnrichmentExecutor::new(&lookup, &f.map, &f.price, budget(5, 60));
        let out = exec
            .run(f.records.clone(), &f.rows, &f.candidates, Instant::now())
            .await;
        assert_eq!((out.processed, out.remaining, out.failed), (3, 0, 2));
        for i in [0, 1] {
            let mut r = out.records[i].clone();
            assert!(r.lookup_attempted_at.take().is_some());
            assert_eq!(r, f.records[i]);
        }
        assert_eq!(out.records[2].lat, 35.0);
        assert!(out.writes.iter().all(|w| w.row_index == 2));
        assert_eq!(lookup.queries(), vec!["A Tokyo", "B Tokyo", "C Tokyo"]);
    }

    #[tokio::test]
    async fn item_cap_halts_and_conserves_counts() {
        let mut lookup = StaticPlaceLookup::new();
        for n in ["A", "B", "C", "D", "E"] {
            lookup = lookup.with_place(format!("{n} Tokyo"), details(n));
        }
        let data: Vec<&[&str]> = vec![
            &["A", "Tokyo"],
            &["B", "Tokyo"],
            &["C", "Tokyo"],
            &["D", "Tokyo"],
            &["E", "Tokyo"],
        ];
        let f = fixture(&lookup, &data);
        let exec = EnrichmentExecutor::new(&lookup, &f.map, &f.price, budget(3, 60));
        let out = exec
            .run(f.records.clone(), &f.rows, &f.candidates, Instant::now())
            .await;
        assert_eq!(out.halted, Some(HaltReason::ItemCap));
        assert_eq!((out.processed, out.remaining), (3, 2));
        assert_eq!(out.processed + out.remaining, f.candidates.len());
        assert_eq!(out.records[3], f.records[3]);
        assert_eq!(out.records[4], f.records[4]);
        assert!(out.records[..3].iter().all(|r| r.lookup_attempted_at.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn time_budget_halts_between_items() {
        let mut lookup = StaticPlaceLookup::new().with_delay(Duration::from_secs(4));
        for n in ["A", "B", "C", "D"] {
            lookup = lookup.with_place(format!("{n} Tokyo"), details(n));
        }
        let data: Vec<&[&str]> = vec![&["A", "Tokyo"], &["B", "Tokyo"], &["C", "Tokyo"], &["D", "Tokyo"]];
        let f = fixture(&lookup, &data);
        // 4s per lookup against a 6s budget: the second lookup starts at 4s and finishes
        // at 8s; the third is never started.
        let exec = EnrichmentExecutor::new(&lookup, &f.map, &f.price, budget(10, 6));
        let out = exec
            .run(f.records.clone(), &f.rows, &f.candidates, Instant::now())
            .await;
        assert_eq!(out.halted, Some(HaltReason::TimeBudget));
        assert_eq!((out.processed, out.remaining), (2, 2));
        assert_eq!(lookup.queries().len(), 2);
    }

    #[tokio::test]
    async fn no_candidates_is_a_no_op() {
        let lookup = StaticPlaceLookup::new();
        let f = fixture(&lookup, &[]);
        let exec = EnrichmentExecutor::new(&lookup, &f.map, &f.price, budget(3, 60));
        let out = exec.run(vec![], &[], &[], Instant::now()).await;
        assert_eq!((out.processed, out.remaining), (0, 0));
        assert!(out.writes.is_empty());
        assert!(f.records.is_empty());
    }
}
