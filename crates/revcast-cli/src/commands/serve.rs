//! MCP server command

use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::{open_warehouse, resolve_config};

/// Start the MCP server on the given host/port
pub async fn cmd_serve(
    db: &Path,
    host: &str,
    port: u16,
    seed: Option<u64>,
    config_path: Option<&Path>,
) -> Result<()> {
    let warehouse = open_warehouse(db)?;
    let config = resolve_config(seed, config_path)?;

    info!(path = warehouse.path(), "serving warehouse over MCP");
    revcast_server::start_mcp_server(warehouse, config, host, port).await
}
