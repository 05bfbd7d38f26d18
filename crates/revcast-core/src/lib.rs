//! Revcast Core Library
//!
//! The weekly MRR forecasting pipeline:
//! - Weekly aggregation of deal records into lever features
//! - Trend-based short-horizon MRR forecast
//! - Gradient-boosted importance ranking of the business levers
//! - SCQA report composition (Situation / Complication / Analysis / Actions)
//! - Warehouse access and CSV ingestion
//! - Typed tool functions for the CLI and MCP server

pub mod aggregate;
pub mod config;
pub mod error;
pub mod forecast;
pub mod gbt;
pub mod import;
pub mod importance;
pub mod levers;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod tools;
pub mod warehouse;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use forecast::TrendForecaster;
pub use importance::ImportanceRanker;
pub use levers::Lever;
pub use models::{
    ActionDeal, ActionType, DealRecord, DealStage, FeatureImportance, ForecastPoint,
    ImportanceReport, LeverImportance, Report, WeeklyRecord,
};
pub use pipeline::{ForecastPipeline, PipelineOutcome};
pub use report::ReportComposer;
pub use warehouse::{SqliteWarehouse, Warehouse};
