//! Persisted-output report command

use std::path::Path;

use anyhow::Result;

use revcast_core::Warehouse;

use super::open_warehouse;

/// Print the persisted predictions and feature importances from the most
/// recent pipeline run
pub fn cmd_report(db: &Path) -> Result<()> {
    let warehouse = open_warehouse(db)?;

    let predictions = warehouse.latest_predictions()?;
    if predictions.is_empty() {
        println!("No persisted forecast. Run `revcast run --seed N` first.");
        return Ok(());
    }

    println!("Forecast predictions:");
    for point in &predictions {
        println!(
            "  Week {} ({}): {:.0} (trend {:+.0}/week, {:+.1}%)",
            point.week_offset,
            point.forecast_week.format("%Y-%m-%d"),
            point.predicted_mrr,
            point.weekly_trend,
            point.change_pct
        );
    }

    let importances = warehouse.latest_importances()?;
    if importances.is_empty() {
        println!("\nNo persisted feature importances (last run was trend-only).");
    } else {
        println!("\nFeature importances:");
        for feature in &importances {
            println!(
                "  {:>2}. [{:<15}] {:<20} {:>5.1}%",
                feature.rank,
                feature.lever.label(),
                feature.feature,
                feature.weight * 100.0
            );
        }
    }
    Ok(())
}
