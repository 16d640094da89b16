use crate::sync::models::{
    CanonicalRecord, ColumnMap, ColumnRole, DEFAULT_PRICE, DEFAULT_TYPE, DEFAULT_URL,
};
use serde::{Deserialize, Serialize};

/// A field a lookup could fill.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gap {
    Coordinates,
    Photo,
    Type,
    Price,
    Description,
    Url,
}

/// A record that needs a lookup, addressed by its data row index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentCandidate {
    pub row_index: usize,
    pub gaps: Vec<Gap>,
}

/// Gaps in one record. Photo presence is judged on the raw cell, not the derived URL.
pub fn gaps(record: &CanonicalRecord, raw: &[String], map: &ColumnMap) -> Vec<Gap> {
    let mut out = Vec::new();
    if !record.has_coordinates() {
        out.push(Gap::Coordinates);
    }
    if map.cell(raw, ColumnRole::PhotoRef).is_empty() {
        out.push(Gap::Photo);
    }
    if record.kind == DEFAULT_TYPE {
        out.push(Gap::Type);
    }
    if record.price_local == DEFAULT_PRICE {
        out.push(Gap::Price);
    }
    if record.description.trim().is_empty() {
        out.push(Gap::Description);
    }
    if record.maps_url == DEFAULT_URL {
        out.push(Gap::Url);
    }
    out
}

/// Records with a real name and at least one gap.
///
/// Fields that are already filled never make a record eligible: this fills gaps,
/// it does not refresh. Records never looked up come first in row order, then the rest
/// by oldest lookup attempt, so gaps no lookup can fill do not starve later rows.
#[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
pub fn select_for_enrichment(
    records: &[CanonicalRecord],
    rows: &[Vec<String>],
    map: &ColumnMap,
) -> Vec<EnrichmentCandidate> {
    const NO_CELLS: &[String] = &[];
    let mut candidates: Vec<EnrichmentCandidate> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.has_name())
        .filter_map(|(row_index, r)| {
            let raw = rows.get(row_index).map(Vec::as_slice).unwrap_or(NO_CELLS);
            let gaps = gaps(r, raw, map);
            if gaps.is_empty() {
                None
            } else {
                Some(EnrichmentCandidate { row_index, gaps })
            }
        })
        .collect();
    candidates.sort_by_key(|c| records[c.row_index].lookup_attempted_at);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::price::PriceRule;
    use crate::sync::transform::transform_rows;
    use crate::sync::models::IdStrategy;
    use chrono::{TimeZone, Utc};

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn select(data: &[Vec<String>]) -> Vec<EnrichmentCandidate> {
        let map = ColumnMap::legacy();
        let recs = transform_rows(data, &map, IdStrategy::Positional, &PriceRule::default(), &|r: &str| r.to_string());
        select_for_enrichment(&recs, data, &map)
    }

    const FULL: &[&str] = &["Ichiran", "Tokyo", "Ramen", "¥¥", "Tonkotsu", "https://maps/1", "35.6", "139.7", "ref"];

    #[test]
    fn complete_rows_are_not_selected() {
        assert!(select(&rows(&[FULL])).is_empty());
    }

    #[test]
    fn unnamed_rows_are_never_selected() {
        assert!(select(&rows(&[&["", "Tokyo"]])).is_empty());
    }

    #[test]
    fn each_gap_is_detected() {
        let mut cases: Vec<(usize, Gap, &str)> = vec![
            (2, Gap::Type, ""),
            (3, Gap::Price, "-"),
            (4, Gap::Description, " "),
            (5, Gap::Url, "#"),
            (6, Gap::Coordinates, "0"),
            (7, Gap::Coordinates, "oops"),
            (8, Gap::Photo, ""),
        ];
        for (col, gap, value) in cases.drain(..) {
            let mut row: Vec<String> = FULL.iter().map(|c| c.to_string()).collect();
            row[col] = value.to_string();
            let out = select(&[row]);
            assert_eq!(out.len(), 1, "column {col}");
            assert_eq!(out[0].gaps, vec![gap], "column {col}");
            assert_eq!(out[0].row_index, 0);
        }
    }

    #[test]
    fn user_photo_url_counts_as_present() {
        let mut row: Vec<String> = FULL.iter().map(|c| c.to_string()).collect();
        row[8] = "https://me/p.jpg".to_string();
        assert!(select(&[row]).is_empty());
    }

    #[test]
    fn keeps_row_indexes() {
        let data = rows(&[FULL, &["Gap", "Kyoto"], FULL, &["Other", "Nara"]]);
        let idx: Vec<usize> = select(&data).into_iter().map(|c| c.row_index).collect();
        assert_eq!(idx, vec![1, 3]);
    }

    #[test]
    fn untried_rows_come_before_attempted_ones() {
        let map = ColumnMap::legacy();
        let data = rows(&[&["A", "Tokyo"], &["B", "Tokyo"], &["C", "Tokyo"], &["D", "Tokyo"]]);
        let mut recs = transform_rows(&data, &map, IdStrategy::Positional, &PriceRule::default(), &|r: &str| r.to_string());
        let at = |h: u32| Some(Utc.with_ymd_and_hms(2026, 5, 1, h, 0, 0).unwrap());
        recs[0].lookup_attempted_at = at(9);
        recs[1].lookup_attempted_at = at(8);
        recs[3].lookup_attempted_at = at(9);

        let idx: Vec<usize> = select_for_enrichment(&recs, &data, &map)
            .into_iter()
            .map(|c| c.row_index)
            .collect();
        assert_eq!(idx, vec![2, 1, 0, 3]);
    }
}
