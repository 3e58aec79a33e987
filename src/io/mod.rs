//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - table/report exports (CSV/JSON/markdown) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
