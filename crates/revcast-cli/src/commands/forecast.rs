//! Quick trend forecast command
//!
//! Skips the importance model entirely, so no seed is needed here.

use std::path::Path;

use anyhow::Result;

use revcast_core::aggregate::{aggregate_weeks, modeling_rows};
use revcast_core::{TrendForecaster, Warehouse};

use super::open_warehouse;

/// Print a trend-only forecast for the next `weeks` weeks
pub fn cmd_forecast(db: &Path, weeks: usize, window: usize) -> Result<()> {
    let warehouse = open_warehouse(db)?;
    let deals = warehouse.load_deals()?;
    let weekly = aggregate_weeks(&deals)?;
    let modeling = modeling_rows(&weekly);

    let points = TrendForecaster::new(window, weeks).forecast(&modeling)?;

    if let Some(first) = points.first() {
        println!(
            "Trend: {:+.0}/week from a baseline of {:.0}",
            first.weekly_trend, first.baseline_mrr
        );
    }
    for point in &points {
        println!(
            "  Week {} ({}): {:.0} ({:+.1}%)",
            point.week_offset,
            point.forecast_week.format("%Y-%m-%d"),
            point.predicted_mrr,
            point.change_pct
        );
    }
    Ok(())
}
