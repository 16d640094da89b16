//! Spreadsheet ⇄ cache reconciliation.
//!
//! One locations sync runs these stages in order:
//! - `columns`: resolve header text to column roles, repairing the header when needed
//! - `transform`: raw rows → `CanonicalRecord`s with defaults applied
//! - `selector`: records with a name and at least one fillable gap
//! - `enrich`: sequential place lookups under an item cap and a wall-clock budget
//! - `writeback`: changed cells persisted in one batched write
//! - `publisher`: the cache snapshot replaced wholesale
//!
//! The itinerary tab has its own full-rewrite flow in `itinerary`.

pub mod columns;
pub mod engine;
pub mod enrich;
pub mod itinerary;
pub mod locks;
pub mod models;
pub mod price;
pub mod publisher;
pub mod selector;
pub mod traits;
pub mod transform;
pub mod writeback;
