//! Core command and shared helpers

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use revcast_core::{PipelineConfig, SqliteWarehouse};

/// Open the warehouse, creating the schema if missing
pub fn open_warehouse(db: &Path) -> Result<SqliteWarehouse> {
    let path = db
        .to_str()
        .context("warehouse path is not valid UTF-8")?;
    SqliteWarehouse::open(path).context("failed to open warehouse")
}

/// Resolve pipeline configuration from --config and/or --seed.
///
/// A --seed on the command line overrides the file's seed. At least one of
/// the two must supply a seed: reproducibility is explicit, never ambient.
pub fn resolve_config(seed: Option<u64>, config_path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match (config_path, seed) {
        (Some(path), seed) => {
            let mut config = PipelineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            if let Some(seed) = seed {
                config.random_seed = seed;
            }
            config
        }
        (None, Some(seed)) => PipelineConfig::with_seed(seed),
        (None, None) => {
            bail!("a random seed is required: pass --seed N or a --config file with random_seed")
        }
    };
    Ok(config)
}

/// Initialize the warehouse schema
pub fn cmd_init(db: &Path) -> Result<()> {
    let warehouse = open_warehouse(db)?;
    info!(path = warehouse.path(), "warehouse initialized");
    println!("Warehouse initialized at {}", warehouse.path());
    Ok(())
}
