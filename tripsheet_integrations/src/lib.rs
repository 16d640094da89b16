//! HTTP adapters for the tripsheet collaborators.
//!
//! Each adapter implements a `tripsheet_core` trait and is gated behind its own feature.

#[cfg(feature = "google_places")]
pub mod google_places;
#[cfg(feature = "google_sheets")]
pub mod google_sheets;
