use crate::sync::models::{
    CanonicalRecord, ColumnMap, ColumnRole, DEFAULT_CITY, DEFAULT_NAME, DEFAULT_PRICE,
    DEFAULT_TYPE, DEFAULT_URL, IdStrategy,
};
use crate::sync::price::PriceRule;
use std::collections::HashMap;

/// A photo cell holding an absolute URL is a user override, not a provider reference.
pub fn is_absolute_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("https://") || s.starts_with("http://")
}

/// Numeric cell → f64; blanks and garbage become 0.
pub fn parse_coordinate(cell: &str) -> f64 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn or_default(cell: &str, default: &str) -> String {
    if cell.is_empty() {
        default.to_string()
    } else {
        cell.to_string()
    }
}

/// Photo URL for a raw photo cell: overrides pass through, references go through `photo_url_for`.
pub fn photo_url(cell: &str, photo_url_for: &dyn Fn(&str) -> String) -> String {
    let cell = cell.trim();
    if cell.is_empty() {
        String::new()
    } else if is_absolute_url(cell) {
        cell.to_string()
    } else {
        photo_url_for(cell)
    }
}

/// Convert data rows (header excluded) into canonical records, one per row, in row order.
#[tracing::instrument(level = "debug", skip_all, fields(rows = rows.len()))]
pub fn transform_rows(
    rows: &[Vec<String>],
    map: &ColumnMap,
    ids: IdStrategy,
    price: &PriceRule,
    photo_url_for: &dyn Fn(&str) -> String,
) -> Vec<CanonicalRecord> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let name = or_default(map.cell(row, ColumnRole::Name), DEFAULT_NAME);
            let city = or_default(map.cell(row, ColumnRole::City), DEFAULT_CITY);
            let price_local = or_default(map.cell(row, ColumnRole::Price), DEFAULT_PRICE);

            let base = ids.base_id(index, &name, &city);
            let n = seen.entry(base.clone()).or_insert(0);
            *n += 1;
            let id = if *n == 1 { base } else { format!("{base}-{n}") };

            CanonicalRecord {
                id,
                price_converted: price.convert(&price_local),
                kind: or_default(map.cell(row, ColumnRole::Type), DEFAULT_TYPE),
                description: map.cell(row, ColumnRole::Description).to_string(),
                maps_url: or_default(map.cell(row, ColumnRole::Url), DEFAULT_URL),
                lat: parse_coordinate(map.cell(row, ColumnRole::Lat)),
                lng: parse_coordinate(map.cell(row, ColumnRole::Lng)),
                photo_url: photo_url(map.cell(row, ColumnRole::PhotoRef), photo_url_for),
                opening_hours: None,
                business_status: None,
                utc_offset_minutes: None,
                lookup_attempted_at: None,
                name,
                city,
                price_local,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn photo(r: &str) -> String {
        format!("https://img/{r}")
    }

    #[test]
    fn applies_defaults_for_blank_cells() {
        let data = rows(&[&["", "", "", "", "", "", "abc", "", ""]]);
        let out = transform_rows(&data, &ColumnMap::legacy(), IdStrategy::Positional, &PriceRule::default(), &photo);
        let r = &out[0];
        assert_eq!(r.id, "loc-0");
        assert_eq!(r.name, "Unknown");
        assert_eq!(r.city, "Japan");
        assert_eq!(r.kind, "Spot");
        assert_eq!(r.price_local, "-");
        assert_eq!(r.price_converted, "-");
        assert_eq!(r.maps_url, "#");
        assert_eq!(r.description, "");
        assert_eq!((r.lat, r.lng), (0.0, 0.0));
        assert_eq!(r.photo_url, "");
    }

    #[test]
    fn photo_cell_url_is_a_user_override() {
        let data = rows(&[
            &["A", "Tokyo", "", "", "", "", "35.6", "139.7", "https://my.photos/a.jpg"],
            &["B", "Tokyo", "", "", "", "", "35.6", "139.7", "ref-b"],
        ]);
        let out = transform_rows(&data, &ColumnMap::legacy(), IdStrategy::Positional, &PriceRule::default(), &photo);
        assert_eq!(out[0].photo_url, "https://my.photos/a.jpg");
        assert_eq!(out[1].photo_url, "https://img/ref-b");
        assert_eq!((out[1].lat, out[1].lng), (35.6, 139.7));
    }

    #[test]
    fn ragged_rows_and_unresolved_roles_read_as_blank() {
        let mut map = ColumnMap::default();
        map.set(ColumnRole::Name, 0);
        let data = rows(&[&["Only name"], &[]]);
        let out = transform_rows(&data, &map, IdStrategy::Positional, &PriceRule::default(), &photo);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Only name");
        assert_eq!(out[1].name, "Unknown");
        assert_eq!(out[1].id, "loc-1");
    }

    #[test]
    fn ids_are_deterministic_for_unchanged_rows() {
        let data = rows(&[&["A", "Tokyo"], &["B", "Osaka"], &["A", "Tokyo"]]);
        for ids in [IdStrategy::Positional, IdStrategy::ContentHash] {
            let a = transform_rows(&data, &ColumnMap::legacy(), ids, &PriceRule::default(), &photo);
            let b = transform_rows(&data, &ColumnMap::legacy(), ids, &PriceRule::default(), &photo);
            let a_ids: Vec<_> = a.iter().map(|r| r.id.clone()).collect();
            let b_ids: Vec<_> = b.iter().map(|r| r.id.clone()).collect();
            assert_eq!(a_ids, b_ids);
        }
        let hashed = transform_rows(&data, &ColumnMap::legacy(), IdStrategy::ContentHash, &PriceRule::default(), &photo);
        assert_eq!(hashed[2].id, format!("{}-2", hashed[0].id));
    }

    #[test]
    fn content_hash_ids_survive_reordering() {
        let data = rows(&[&["A", "Tokyo"], &["B", "Osaka"]]);
        let swapped = rows(&[&["B", "Osaka"], &["A", "Tokyo"]]);
        let a = transform_rows(&data, &ColumnMap::legacy(), IdStrategy::ContentHash, &PriceRule::default(), &photo);
        let b = transform_rows(&swapped, &ColumnMap::legacy(), IdStrategy::ContentHash, &PriceRule::default(), &photo);
        assert_eq!(a[0].id, b[1].id);
        assert_eq!(a[1].id, b[0].id);
    }

    #[test]
    fn malformed_coordinates_become_zero() {
        assert_eq!(parse_coordinate("abc"), 0.0);
        assert_eq!(parse_coordinate("NaN"), 0.0);
        assert_eq!(parse_coordinate(" 35.01 "), 35.01);
    }
}
