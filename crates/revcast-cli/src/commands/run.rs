//! Full pipeline run command

use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use revcast_core::ForecastPipeline;

use super::{open_warehouse, resolve_config};

/// Run the full weekly pipeline, print the rendered report, persist outputs
pub fn cmd_run(db: &Path, seed: Option<u64>, config_path: Option<&Path>) -> Result<()> {
    let warehouse = open_warehouse(db)?;
    let config = resolve_config(seed, config_path)?;

    let pipeline = ForecastPipeline::new(config, &warehouse)?;
    let outcome = pipeline.run(Utc::now())?;

    println!("{}", outcome.report.render());
    Ok(())
}
