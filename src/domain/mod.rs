//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input records and load metadata (`SalesRecord`, `SalesDataset`)
//! - the grouping key (`MonthlyPeriod`) and filters (`RecordFilter`)
//! - aggregate outputs (`MonthlyTotal`, `MonthlyAggregate`, `CategoryMonthPivot`, etc.)

pub mod types;

pub use types::*;
