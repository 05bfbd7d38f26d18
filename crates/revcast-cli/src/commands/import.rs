//! CSV import command

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use revcast_core::import::{parse_actions_csv, parse_deals_csv};

use super::open_warehouse;

/// Import a deal CSV (default) or a next-best-action CSV (--actions)
pub fn cmd_import(db: &Path, file: &Path, actions: bool) -> Result<()> {
    let warehouse = open_warehouse(db)?;
    let reader = File::open(file)
        .with_context(|| format!("failed to open {}", file.display()))?;

    if actions {
        let parsed = parse_actions_csv(reader)?;
        let count = warehouse.replace_actions(&parsed)?;
        println!("Imported {} action deals (replaced previous list)", count);
    } else {
        let parsed = parse_deals_csv(reader)?;
        let count = warehouse.upsert_deals(&parsed)?;
        println!("Imported {} deals", count);
    }
    Ok(())
}
