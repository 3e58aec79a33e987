//! `monthly-sales` library crate.
//!
//! The binary (`sales`) is a thin wrapper around this library so that:
//!
//! - loading and aggregation are testable without spawning processes
//! - the CLI tables and the TUI share one view pipeline

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
