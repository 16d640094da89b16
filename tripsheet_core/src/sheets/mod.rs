//! Spreadsheet collaborator: the authoritative store for locations and itinerary rows.
//!
//! The engine only talks to the `Spreadsheet` trait. Adapters live in
//! `tripsheet_integrations`; `memory::MemorySpreadsheet` backs tests and dry runs.

pub mod a1;
pub mod memory;
pub mod traits;
