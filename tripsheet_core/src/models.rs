use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner of a spreadsheet-backed dataset. Cache snapshots are keyed on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    #[tracing::instrument(level = "debug")]
    pub fn new(value: impl Into<String> + fmt::Debug) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::Config("owner id is empty".to_string()));
        }
        Ok(Self(value.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The spreadsheet a sync invocation reads from and writes to, bound to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSource {
    pub owner_id: OwnerId,
    pub spreadsheet_id: String,
}

impl SheetSource {
    /// Validate the pair up front; a blank spreadsheet id is a configuration error.
    #[tracing::instrument(level = "debug")]
    pub fn new(
        owner_id: impl Into<String> + fmt::Debug,
        spreadsheet_id: impl Into<String> + fmt::Debug,
    ) -> Result<Self> {
        let owner_id = OwnerId::new(owner_id)?;
        let spreadsheet_id = spreadsheet_id.into();
        if spreadsheet_id.trim().is_empty() {
            return Err(Error::Config(format!(
                "no spreadsheet configured for owner '{owner_id}'"
            )));
        }
        Ok(Self {
            owner_id,
            spreadsheet_id: spreadsheet_id.trim().to_string(),
        })
    }
}
