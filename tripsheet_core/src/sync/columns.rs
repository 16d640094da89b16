//! Header → column role resolution and header repair planning.
//!
//! Both functions are pure. Persisting a repaired header is the engine's job and must
//! happen before any row is addressed by index.

use crate::sync::models::{ColumnMap, ColumnRole};

fn normalize(cell: &str) -> String {
    cell.trim().to_lowercase()
}

/// Resolve each role to a column.
///
/// 1. Alias match on normalized header text; per role the leftmost matching header wins.
///    A column already claimed by an earlier role is skipped.
/// 2. Legacy fallback: an unresolved role takes its legacy position when the header row
///    reaches that far and no other role claimed it.
#[tracing::instrument(level = "debug")]
pub fn resolve_columns(header: &[String]) -> ColumnMap {
    let normalized: Vec<String> = header.iter().map(|h| normalize(h)).collect();
    let mut map = ColumnMap::default();

    for role in ColumnRole::ALL {
        let aliases = role.aliases();
        let hit = normalized
            .iter()
            .enumerate()
            .find(|(i, h)| !h.is_empty() && aliases.contains(&h.as_str()) && !map.claims(*i))
            .map(|(i, _)| i);
        if let Some(i) = hit {
            map.set(role, i);
        }
    }

    for role in ColumnRole::ALL {
        if map.is_resolved(role) {
            continue;
        }
        let legacy = role.legacy_index();
        if legacy < header.len() && !map.claims(legacy) {
            map.set(role, legacy);
        }
    }

    map
}

/// Header cells to append so that coordinates and photo references have a home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRepair {
    /// Full header row after appending.
    pub header: Vec<String>,
    pub map: ColumnMap,
    pub added: Vec<ColumnRole>,
}

/// Plan a header repair, or `None` when every repairable role already resolves.
///
/// An empty header row is never repaired: there is no sheet layout to extend.
#[tracing::instrument(level = "debug")]
pub fn plan_header_repair(header: &[String], map: &ColumnMap) -> Option<HeaderRepair> {
    if header.iter().all(|h| h.trim().is_empty()) {
        return None;
    }
    let missing: Vec<ColumnRole> = ColumnRole::REPAIRABLE
        .into_iter()
        .filter(|r| !map.is_resolved(*r))
        .collect();
    if missing.is_empty() {
        return None;
    }

    let mut header = header.to_vec();
    let mut map = *map;
    for role in &missing {
        map.set(*role, header.len());
        header.push(role.header_label().to_string());
    }
    Some(HeaderRepair {
        header,
        map,
        added: missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_named_headers_in_any_order() {
        let h = header(&[
            "Photo Reference",
            " Restaurant Name ",
            "LATITUDE",
            "Longitude",
            "City",
            "Category",
            "Price",
            "Notes",
            "Google Maps URL",
        ]);
        let map = resolve_columns(&h);
        assert_eq!(map.get(ColumnRole::Name), Some(1));
        assert_eq!(map.get(ColumnRole::City), Some(4));
        assert_eq!(map.get(ColumnRole::Type), Some(5));
        assert_eq!(map.get(ColumnRole::Description), Some(7));
        assert_eq!(map.get(ColumnRole::Url), Some(8));
        assert_eq!(map.get(ColumnRole::Lat), Some(2));
        assert_eq!(map.get(ColumnRole::Lng), Some(3));
        assert_eq!(map.get(ColumnRole::PhotoRef), Some(0));
        assert!(plan_header_repair(&h, &map).is_none());
    }

    #[test]
    fn first_matching_header_wins() {
        let h = header(&["Name", "Place", "City"]);
        let map = resolve_columns(&h);
        assert_eq!(map.get(ColumnRole::Name), Some(0));
    }

    #[test]
    fn unnamed_nine_column_sheet_uses_legacy_order() {
        let h = header(&["a", "b", "c", "d", "e", "f", "g", "h", "i"]);
        let map = resolve_columns(&h);
        assert_eq!(map, ColumnMap::legacy());
        assert!(plan_header_repair(&h, &map).is_none());
    }

    #[test]
    fn fallback_skips_claimed_columns() {
        // "Latitude" sits where city would fall back to.
        let h = header(&["Name", "Latitude", "Longitude"]);
        let map = resolve_columns(&h);
        assert_eq!(map.get(ColumnRole::Lat), Some(1));
        assert_eq!(map.get(ColumnRole::Lng), Some(2));
        assert_eq!(map.get(ColumnRole::City), None);
        assert_eq!(map.get(ColumnRole::Type), None);
    }

    #[test]
    fn short_legacy_sheet_gets_three_appended_headers() {
        let h = header(&["Name", "City", "Type", "Price", "Description", "URL"]);
        let map = resolve_columns(&h);
        assert_eq!(map.get(ColumnRole::Lat), None);

        let repair = plan_header_repair(&h, &map).unwrap();
        assert_eq!(
            repair.added,
            vec![ColumnRole::Lat, ColumnRole::Lng, ColumnRole::PhotoRef]
        );
        assert_eq!(&repair.header[6..], &["Latitude", "Longitude", "Photo Reference"]);
        assert_eq!(repair.map.get(ColumnRole::Lat), Some(6));
        assert_eq!(repair.map.get(ColumnRole::Lng), Some(7));
        assert_eq!(repair.map.get(ColumnRole::PhotoRef), Some(8));
        assert_eq!(repair.map.get(ColumnRole::Name), Some(0));
    }

    #[test]
    fn repair_appends_only_what_is_missing() {
        let h = header(&["Name", "City", "Lat", "Lng"]);
        let map = resolve_columns(&h);
        let repair = plan_header_repair(&h, &map).unwrap();
        assert_eq!(repair.added, vec![ColumnRole::PhotoRef]);
        assert_eq!(repair.map.get(ColumnRole::PhotoRef), Some(4));
    }

    #[test]
    fn empty_header_is_left_alone() {
        let map = resolve_columns(&[]);
        assert_eq!(map, ColumnMap::default());
        assert!(plan_header_repair(&[], &map).is_none());
    }
}
