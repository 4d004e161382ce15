//! Data ingestion layer for chatlog.
//!
//! Opens an export archive (zip bundle or extracted directory), parses its
//! JSON and CSV files into typed records, builds the [`chatlog_core::Index`]
//! and groups message activity into calendar periods.

pub mod loader;
pub mod reader;
pub mod timeseries;

pub use chatlog_core as core;
pub use loader::load_package;
