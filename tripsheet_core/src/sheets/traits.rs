use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One range in a batched values write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeWrite {
    /// A1 range, e.g. `'Locations'!G2`.
    pub range: String,
    pub values: Vec<Vec<String>>,
}

impl RangeWrite {
    pub fn single(range: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            values: vec![vec![value.into()]],
        }
    }

    pub fn cell_count(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }
}

/// Descriptor for one tab of a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub sheet_id: i64,
    pub title: String,
    pub index: usize,
}

/// Raw spreadsheet RPC surface consumed by the sync engine.
///
/// Error contract:
/// - a range naming a tab that does not exist → `Error::NotFound`
/// - `create_tab` for a title that already exists → `Error::Conflict`
/// - anything else → `Error::Backend*`
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    /// Read a range. Rows are returned as displayed text; trailing empty cells may be absent.
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>>;

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<()>;

    /// Write several ranges in one request.
    async fn batch_write(&self, spreadsheet_id: &str, writes: Vec<RangeWrite>) -> Result<()>;

    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<()>;

    async fn create_tab(&self, spreadsheet_id: &str, title: &str) -> Result<()>;

    async fn tab_metadata(&self, spreadsheet_id: &str) -> Result<Vec<TabInfo>>;
}
