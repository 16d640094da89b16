//! Day-plan tab: read with create-on-missing, and full-replace write.

use crate::Result;
use crate::sheets::a1;
use crate::sheets::traits::Spreadsheet;
use crate::sync::models::ItineraryItem;
use std::cmp::Ordering;

pub const ITINERARY_HEADER: [&str; 4] = ["Day", "LocationID", "Order", "Notes"];

/// Items with a location reference, in row order. Unparseable `order` cells become 0.
pub fn rows_to_items(rows: &[Vec<String>]) -> Vec<ItineraryItem> {
    rows.iter()
        .filter_map(|row| {
            let cell = |i: usize| row.get(i).map(|s| s.trim()).unwrap_or("");
            let location_id = cell(1);
            if location_id.is_empty() {
                return None;
            }
            Some(ItineraryItem {
                day: cell(0).to_string(),
                location_id: location_id.to_string(),
                order: cell(2).parse().unwrap_or(0),
                note: cell(3).to_string(),
            })
        })
        .collect()
}

fn compare(a: &ItineraryItem, b: &ItineraryItem) -> Ordering {
    a.day.cmp(&b.day).then(a.order.cmp(&b.order))
}

/// Stable sort by `(day, order)`; day compares as text.
pub fn sort_items(items: &mut [ItineraryItem]) {
    items.sort_by(compare);
}

fn item_row(item: &ItineraryItem) -> Vec<String> {
    vec![
        item.day.clone(),
        item.location_id.clone(),
        item.order.to_string(),
        item.note.clone(),
    ]
}

/// Create the tab and write its header. A concurrent creator winning the race is fine.
#[tracing::instrument(level = "info", name = "tripsheet.itinerary.create_tab", skip(sheets))]
pub async fn create_itinerary_tab(
    sheets: &dyn Spreadsheet,
    spreadsheet_id: &str,
    tab: &str,
) -> Result<()> {
    match sheets.create_tab(spreadsheet_id, tab).await {
        Ok(()) => {}
        Err(e) if e.is_conflict() => {
            tracing::debug!(error = %e, "itinerary tab already exists");
        }
        Err(e) => return Err(e),
    }
    let header = vec![ITINERARY_HEADER.iter().map(|s| s.to_string()).collect()];
    sheets
        .write_range(spreadsheet_id, &a1::span(tab, 0, 1, 3, Some(1)), header)
        .await
}

/// Read the day plan. A missing tab is created (with header) and reads as empty.
#[tracing::instrument(level = "info", name = "tripsheet.itinerary.read", skip(sheets))]
pub async fn read_itinerary(
    sheets: &dyn Spreadsheet,
    spreadsheet_id: &str,
    tab: &str,
) -> Result<Vec<ItineraryItem>> {
    let range = a1::span(tab, 0, 2, 3, None);
    match sheets.read_range(spreadsheet_id, &range).await {
        Ok(rows) => Ok(rows_to_items(&rows)),
        Err(e) if e.is_not_found() => {
            tracing::info!(tab, "itinerary tab missing; creating");
            create_itinerary_tab(sheets, spreadsheet_id, tab).await?;
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Replace the data region with `items` sorted. Returns the sorted, filtered list.
///
/// Items without a location reference are dropped. The header row is left alone.
#[tracing::instrument(
    level = "info",
    name = "tripsheet.itinerary.write",
    skip(sheets, items),
    fields(items = items.len())
)]
pub async fn write_itinerary(
    sheets: &dyn Spreadsheet,
    spreadsheet_id: &str,
    tab: &str,
    items: Vec<ItineraryItem>,
) -> Result<Vec<ItineraryItem>> {
    let mut items: Vec<ItineraryItem> = items
        .into_iter()
        .filter(|i| !i.location_id.trim().is_empty())
        .collect();
    sort_items(&mut items);

    let tabs = sheets.tab_metadata(spreadsheet_id).await?;
    if !tabs.iter().any(|t| t.title == tab) {
        create_itinerary_tab(sheets, spreadsheet_id, tab).await?;
    }

    sheets
        .clear_range(spreadsheet_id, &a1::span(tab, 0, 2, 3, None))
        .await?;
    if !items.is_empty() {
        let values = items.iter().map(item_row).collect();
        sheets
            .write_range(spreadsheet_id, &a1::span(tab, 0, 2, 3, None), values)
            .await?;
    }
    Ok(items)
}
