//! Snapshot cache: the fast read path in front of the spreadsheet.
//!
//! One snapshot per (owner, kind). Only the sync publisher writes here.

pub mod memory;
pub mod sqlite;
pub mod traits;
