//! Error types for Revcast

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Fewer than two weekly records - no week-over-week delta is computable.
    /// Fatal: no report is produced and nothing is persisted.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Input rows are missing required columns. Fatal: schema mismatches are
    /// a configuration error, never silently coerced.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Degenerate training input (too few distinct rows or zero target
    /// variance). Recoverable: the pipeline falls back to a trend-only
    /// report with the Analysis section omitted.
    #[error("Model fit error: {0}")]
    ModelFit(String),

    #[error("Warehouse error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Warehouse pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
