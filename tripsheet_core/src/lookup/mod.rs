//! Place-lookup collaborator used to fill gaps in location rows.

pub mod memory;
pub mod traits;
