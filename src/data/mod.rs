//! Dataset sources: the session cache and the synthetic sample generator.

pub mod cache;
pub mod sample;

pub use cache::DatasetCache;
pub use sample::{generate_sample, write_sample_csv, SampleConfig};
