use crate::sheets::a1::RangeRef;
use crate::sheets::traits::{RangeWrite, Spreadsheet, TabInfo};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A call observed by `MemorySpreadsheet`, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetCall {
    Read { range: String },
    Write { range: String, values: Vec<Vec<String>> },
    BatchWrite { writes: Vec<RangeWrite> },
    Clear { range: String },
    CreateTab { title: String },
    TabMetadata,
}

#[derive(Debug, Clone, Default)]
struct Tab {
    sheet_id: i64,
    title: String,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct State {
    books: HashMap<String, Vec<Tab>>,
    next_sheet_id: i64,
    calls: Vec<SheetCall>,
    create_race: bool,
    fail_batch_write: Option<String>,
    fail_create_tab: Option<String>,
}

/// In-memory spreadsheet with Google-Sheets-like range semantics.
///
/// Used for local development and unit tests:
/// - reads drop trailing empty cells and trailing empty rows
/// - every call is recorded (see `calls()`)
/// - faults can be injected for write and tab-creation paths
#[derive(Clone, Default)]
pub struct MemorySpreadsheet {
    state: Arc<Mutex<State>>,
}

impl MemorySpreadsheet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create (or replace) a tab with the given rows.
    pub fn with_tab(self, spreadsheet_id: &str, title: &str, rows: Vec<Vec<&str>>) -> Self {
        self.put_tab(
            spreadsheet_id,
            title,
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        );
        self
    }

    pub fn put_tab(&self, spreadsheet_id: &str, title: &str, rows: Vec<Vec<String>>) {
        let mut st = self.lock();
        st.next_sheet_id += 1;
        let sheet_id = st.next_sheet_id;
        let book = st.books.entry(spreadsheet_id.to_string()).or_default();
        book.retain(|t| t.title != title);
        book.push(Tab {
            sheet_id,
            title: title.to_string(),
            rows,
        });
    }

    /// Current contents of a tab, normalized like a full-tab read.
    pub fn rows(&self, spreadsheet_id: &str, title: &str) -> Option<Vec<Vec<String>>> {
        let st = self.lock();
        st.books
            .get(spreadsheet_id)?
            .iter()
            .find(|t| t.title == title)
            .map(|t| normalize(t.rows.clone()))
    }

    pub fn calls(&self) -> Vec<SheetCall> {
        self.lock().calls.clone()
    }

    pub fn batch_writes(&self) -> Vec<Vec<RangeWrite>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SheetCall::BatchWrite { writes } => Some(writes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// `create_tab` creates the tab but reports `Conflict`, as if a concurrent caller won.
    pub fn simulate_create_race(&self, on: bool) {
        self.lock().create_race = on;
    }

    pub fn fail_batch_write(&self, message: Option<&str>) {
        self.lock().fail_batch_write = message.map(str::to_string);
    }

    pub fn fail_create_tab(&self, message: Option<&str>) {
        self.lock().fail_create_tab = message.map(str::to_string);
    }
}

fn normalize(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    for row in rows.iter_mut() {
        while row.last().is_some_and(|c| c.is_empty()) {
            row.pop();
        }
    }
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

fn tab_mut<'a>(st: &'a mut State, spreadsheet_id: &str, title: &str) -> Result<&'a mut Tab> {
    st.books
        .get_mut(spreadsheet_id)
        .ok_or_else(|| Error::NotFound(format!("spreadsheet '{spreadsheet_id}' not found")))?
        .iter_mut()
        .find(|t| t.title == title)
        .ok_or_else(|| Error::NotFound(format!("tab '{title}' not found")))
}

fn write_into(tab: &mut Tab, r: &RangeRef, values: &[Vec<String>]) {
    for (i, vals) in values.iter().enumerate() {
        let row_idx = r.start_row - 1 + i;
        if tab.rows.len() <= row_idx {
            tab.rows.resize(row_idx + 1, Vec::new());
        }
        let row = &mut tab.rows[row_idx];
        for (j, v) in vals.iter().enumerate() {
            let col = r.start_col + j;
            if row.len() <= col {
                row.resize(col + 1, String::new());
            }
            row[col] = v.clone();
        }
    }
}

#[async_trait]
impl Spreadsheet for MemorySpreadsheet {
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let r = RangeRef::parse(range)?;
        let mut st = self.lock();
        st.calls.push(SheetCall::Read {
            range: range.to_string(),
        });
        let tab = tab_mut(&mut st, spreadsheet_id, &r.tab)?;

        let rows = tab
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| *i + 1 >= r.start_row && r.end_row.is_none_or(|end| *i < end))
            .map(|(_, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(j, _)| *j >= r.start_col && r.end_col.is_none_or(|end| *j <= end))
                    .map(|(_, c)| c.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(normalize(rows))
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<()> {
        let r = RangeRef::parse(range)?;
        let mut st = self.lock();
        st.calls.push(SheetCall::Write {
            range: range.to_string(),
            values: values.clone(),
        });
        let tab = tab_mut(&mut st, spreadsheet_id, &r.tab)?;
        write_into(tab, &r, &values);
        Ok(())
    }

    async fn batch_write(&self, spreadsheet_id: &str, writes: Vec<RangeWrite>) -> Result<()> {
        let parsed = writes
            .iter()
            .map(|w| RangeRef::parse(&w.range))
            .collect::<Result<Vec<_>>>()?;
        let mut st = self.lock();
        st.calls.push(SheetCall::BatchWrite {
            writes: writes.clone(),
        });
        if let Some(msg) = st.fail_batch_write.clone() {
            return Err(Error::BackendMessage(msg));
        }
        // Validate every target before touching anything: the batch is all-or-nothing.
        for r in &parsed {
            tab_mut(&mut st, spreadsheet_id, &r.tab)?;
        }
        for (r, w) in parsed.iter().zip(writes.iter()) {
            let tab = tab_mut(&mut st, spreadsheet_id, &r.tab)?;
            write_into(tab, r, &w.values);
        }
        Ok(())
    }

    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<()> {
        let r = RangeRef::parse(range)?;
        let mut st = self.lock();
        st.calls.push(SheetCall::Clear {
            range: range.to_string(),
        });
        let tab = tab_mut(&mut st, spreadsheet_id, &r.tab)?;
        for (i, row) in tab.rows.iter_mut().enumerate() {
            if i + 1 < r.start_row || r.end_row.is_some_and(|end| i >= end) {
                continue;
            }
            for (j, c) in row.iter_mut().enumerate() {
                if j >= r.start_col && r.end_col.is_none_or(|end| j <= end) {
                    c.clear();
                }
            }
        }
        tab.rows = normalize(std::mem::take(&mut tab.rows));
        Ok(())
    }

    async fn create_tab(&self, spreadsheet_id: &str, title: &str) -> Result<()> {
        let mut st = self.lock();
        st.calls.push(SheetCall::CreateTab {
            title: title.to_string(),
        });
        if let Some(msg) = st.fail_create_tab.clone() {
            return Err(Error::BackendMessage(msg));
        }
        let exists = st
            .books
            .get(spreadsheet_id)
            .is_some_and(|b| b.iter().any(|t| t.title == title));
        if exists {
            return Err(Error::Conflict(format!("tab '{title}' already exists")));
        }
        st.next_sheet_id += 1;
        let sheet_id = st.next_sheet_id;
        let race = st.create_race;
        st.books
            .entry(spreadsheet_id.to_string())
            .or_default()
            .push(Tab {
                sheet_id,
                title: title.to_string(),
                rows: Vec::new(),
            });
        if race {
            return Err(Error::Conflict(format!("tab '{title}' already exists")));
        }
        Ok(())
    }

    async fn tab_metadata(&self, spreadsheet_id: &str) -> Result<Vec<TabInfo>> {
        let mut st = self.lock();
        st.calls.push(SheetCall::TabMetadata);
        let book = st
            .books
            .get(spreadsheet_id)
            .ok_or_else(|| Error::NotFound(format!("spreadsheet '{spreadsheet_id}' not found")))?;
        Ok(book
            .iter()
            .enumerate()
            .map(|(index, t)| TabInfo {
                sheet_id: t.sheet_id,
                title: t.title.clone(),
                index,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> MemorySpreadsheet {
        MemorySpreadsheet::new().with_tab(
            "s1",
            "Locations",
            vec![vec!["Name", "City"], vec!["Ramen", "Tokyo", ""], vec![], vec!["Sushi"]],
        )
    }

    #[tokio::test]
    async fn reads_ranges_and_trims_trailing_blanks() {
        let s = sheet();
        let all = s.read_range("s1", "'Locations'").await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[1], vec!["Ramen", "Tokyo"]);
        assert!(all[2].is_empty());

        let body = s.read_range("s1", "'Locations'!B2:B").await.unwrap();
        assert_eq!(body, vec![vec!["Tokyo".to_string()]]);
    }

    #[tokio::test]
    async fn missing_tab_is_not_found() {
        let err = sheet().read_range("s1", "'Itinerary'!A2:D").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn batch_write_grows_grid_and_clear_trims() {
        let s = sheet();
        s.batch_write(
            "s1",
            vec![RangeWrite::single("'Locations'!D2", "x"), RangeWrite::single("'Locations'!A6", "y")],
        )
        .await
        .unwrap();
        let rows = s.rows("s1", "Locations").unwrap();
        assert_eq!(rows[1], vec!["Ramen", "Tokyo", "", "x"]);
        assert_eq!(rows[5], vec!["y"]);

        s.clear_range("s1", "'Locations'!A2:D").await.unwrap();
        let rows = s.rows("s1", "Locations").unwrap();
        assert_eq!(rows, vec![vec!["Name".to_string(), "City".to_string()]]);
    }

    #[tokio::test]
    async fn batch_write_is_all_or_nothing() {
        let s = sheet();
        let err = s
            .batch_write(
                "s1",
                vec![RangeWrite::single("'Locations'!D2", "x"), RangeWrite::single("'Nope'!A1", "y")],
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(s.rows("s1", "Locations").unwrap()[1], vec!["Ramen", "Tokyo"]);
    }

    #[tokio::test]
    async fn create_tab_reports_conflicts() {
        let s = sheet();
        assert!(s.create_tab("s1", "Locations").await.unwrap_err().is_conflict());
        s.create_tab("s1", "Itinerary").await.unwrap();
        let titles: Vec<String> = s
            .tab_metadata("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Locations", "Itinerary"]);
    }
}
