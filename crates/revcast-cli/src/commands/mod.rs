//! CLI command implementations
//!
//! - `core` - init and shared warehouse/config helpers
//! - `import` - CSV ingestion of deals and next-best-action lists
//! - `run` - full pipeline run and report rendering
//! - `forecast` - quick trend forecast
//! - `report` - print persisted outputs of the last run
//! - `serve` - MCP server

pub mod core;
pub mod forecast;
pub mod import;
pub mod report;
pub mod run;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use forecast::*;
pub use import::*;
pub use report::*;
pub use run::*;
pub use serve::*;
