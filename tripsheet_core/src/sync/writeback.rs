use crate::Result;
use crate::sheets::a1;
use crate::sheets::traits::{RangeWrite, Spreadsheet};
use crate::sync::models::{ColumnMap, PendingWrite};

/// Single-cell ranges for every pending write whose column is resolved.
///
/// Data row `i` lives on spreadsheet row `i + 2` (row 1 is the header).
pub fn plan_writes(pending: &[PendingWrite], map: &ColumnMap, tab: &str) -> Vec<RangeWrite> {
    pending
        .iter()
        .filter_map(|w| {
            let Some(col) = map.get(w.field) else {
                tracing::debug!(field = %w.field, row = w.row_index, "column unresolved; dropping write");
                return None;
            };
            Some(RangeWrite::single(
                a1::cell(tab, col, w.row_index + 2),
                w.value.clone(),
            ))
        })
        .collect()
}

/// Persist pending writes in one batched request. Returns the number of cells written.
///
/// Nothing is sent when there is nothing to write.
#[tracing::instrument(level = "info", name = "tripsheet.writeback", skip(sheets, pending, map))]
pub async fn write_back(
    sheets: &dyn Spreadsheet,
    spreadsheet_id: &str,
    tab: &str,
    map: &ColumnMap,
    pending: &[PendingWrite],
) -> Result<usize> {
    let writes = plan_writes(pending, map, tab);
    if writes.is_empty() {
        return Ok(0);
    }
    let cells = writes.iter().map(RangeWrite::cell_count).sum();
    sheets.batch_write(spreadsheet_id, writes).await?;
    tracing::info!(cells, "wrote changed cells");
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::memory::{MemorySpreadsheet, SheetCall};
    use crate::sync::models::ColumnRole;

    fn pw(row_index: usize, field: ColumnRole, value: &str) -> PendingWrite {
        PendingWrite {
            row_index,
            field,
            value: value.to_string(),
        }
    }

    #[test]
    fn plans_single_cell_ranges_below_header() {
        let map = ColumnMap::legacy();
        let writes = plan_writes(
            &[
                pw(0, ColumnRole::Lat, "35.1"),
                pw(3, ColumnRole::PhotoRef, "abc"),
            ],
            &map,
            "Locations",
        );
        assert_eq!(
            writes,
            vec![
                RangeWrite::single("'Locations'!G2", "35.1"),
                RangeWrite::single("'Locations'!I5", "abc"),
            ]
        );
    }

    #[test]
    fn unresolved_columns_are_dropped() {
        let mut map = ColumnMap::default();
        map.set(ColumnRole::Name, 0);
        let writes = plan_writes(&[pw(0, ColumnRole::Lat, "1")], &map, "Locations");
        assert!(writes.is_empty());
    }

    #[tokio::test]
    async fn empty_write_back_sends_nothing() {
        let sheets = MemorySpreadsheet::new().with_tab("s1", "Locations", vec![vec!["Name"]]);
        let n = write_back(&sheets, "s1", "Locations", &ColumnMap::legacy(), &[])
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert!(sheets.calls().is_empty());
    }

    #[tokio::test]
    async fn write_back_is_one_batch() {
        let sheets = MemorySpreadsheet::new().with_tab(
            "s1",
            "Locations",
            vec![vec!["Name"], vec!["Ichiran"]],
        );
        let n = write_back(
            &sheets,
            "s1",
            "Locations",
            &ColumnMap::legacy(),
            &[pw(0, ColumnRole::Lat, "35"), pw(0, ColumnRole::Lng, "139")],
        )
        .await
        .unwrap();
        assert_eq!(n, 2);
        let calls = sheets.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], SheetCall::BatchWrite { writes } if writes.len() == 2));
        let rows = sheets.rows("s1", "Locations").unwrap();
        assert_eq!(rows[1][6], "35");
        assert_eq!(rows[1][7], "139");
    }
}
