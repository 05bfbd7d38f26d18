//! Assistant-facing tool implementations
//!
//! Typed entry points shared by the CLI and the MCP server. Each tool is an
//! explicit function with a declared params/result contract - there is no
//! string-based dispatch into arbitrary code paths. All tools treat the
//! warehouse as read-mostly; only `forecast_mrr` writes (the two output
//! tables, wholesale, after a fully successful run).

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{FeatureImportance, ForecastPoint, Report};
use crate::pipeline::ForecastPipeline;
use crate::warehouse::Warehouse;

// =============================================================================
// forecast_mrr
// =============================================================================

/// Result of the zero-argument weekly report tool
#[derive(Debug, Serialize)]
pub struct WeeklyReportResult {
    /// The rendered four-section report
    pub report_text: String,
    /// Structured sections for clients that want them individually
    pub report: Report,
    pub forecast: Vec<ForecastPoint>,
    /// Ranked feature importances; empty in a trend-only run
    pub importance: Vec<FeatureImportance>,
    /// True when the importance model could not be fit this run
    pub trend_only: bool,
}

/// Generate the weekly MRR forecast report. Runs the full pipeline and
/// persists the predictions and importance tables.
pub fn forecast_mrr(warehouse: &dyn Warehouse, config: &PipelineConfig) -> Result<WeeklyReportResult> {
    let pipeline = ForecastPipeline::new(config.clone(), warehouse)?;
    let outcome = pipeline.run(Utc::now())?;

    Ok(WeeklyReportResult {
        report_text: outcome.report.render(),
        trend_only: outcome.importance.is_none(),
        importance: outcome
            .importance
            .map(|report| report.features)
            .unwrap_or_default(),
        forecast: outcome.forecast,
        report: outcome.report,
    })
}

// =============================================================================
// forecast_trend
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ForecastTrendParams {
    /// Number of weeks to forecast (default: the configured horizon)
    #[schemars(description = "Number of weeks to forecast (default 4)")]
    pub weeks: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TrendForecastResult {
    pub points: Vec<ForecastPoint>,
    /// Average weekly MRR change applied per step
    pub weekly_trend: f64,
    /// Last observed MRR the extrapolation was seeded from
    pub baseline_mrr: f64,
}

/// Quick trend-based forecast: no importance ranking, no persistence.
pub fn forecast_trend(
    warehouse: &dyn Warehouse,
    config: &PipelineConfig,
    params: ForecastTrendParams,
) -> Result<TrendForecastResult> {
    let pipeline = ForecastPipeline::new(config.clone(), warehouse)?;
    let points = pipeline.run_trend_forecast(params.weeks)?;

    let (weekly_trend, baseline_mrr) = points
        .first()
        .map(|p| (p.weekly_trend, p.baseline_mrr))
        .unwrap_or((0.0, 0.0));

    Ok(TrendForecastResult {
        points,
        weekly_trend,
        baseline_mrr,
    })
}

// =============================================================================
// get_latest_forecast / get_feature_importance
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LatestForecastResult {
    pub predictions: Vec<ForecastPoint>,
}

/// Read the persisted predictions from the most recent pipeline run.
pub fn get_latest_forecast(warehouse: &dyn Warehouse) -> Result<LatestForecastResult> {
    Ok(LatestForecastResult {
        predictions: warehouse.latest_predictions()?,
    })
}

#[derive(Debug, Serialize)]
pub struct FeatureImportanceResult {
    pub features: Vec<FeatureImportance>,
}

/// Read the persisted feature importances from the most recent run.
pub fn get_feature_importance(warehouse: &dyn Warehouse) -> Result<FeatureImportanceResult> {
    Ok(FeatureImportanceResult {
        features: warehouse.latest_importances()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DealRecord, DealStage};
    use crate::warehouse::SqliteWarehouse;
    use chrono::NaiveDate;

    fn seeded_warehouse() -> SqliteWarehouse {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        let mut deals = Vec::new();
        let first_close = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        for week in 0..10 {
            deals.push(DealRecord {
                deal_id: format!("w{}", week),
                company_name: format!("Company {}", week),
                mrr: 1_500.0 + (week % 3) as f64 * 900.0,
                stage: DealStage::ClosedWon,
                close_date: Some(first_close + chrono::Duration::weeks(week)),
                created_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                region: "EMEA".into(),
                is_at_risk: false,
                days_in_pipeline: 20 + week as u32,
            });
        }
        warehouse.upsert_deals(&deals).unwrap();
        warehouse
    }

    #[test]
    fn test_forecast_mrr_tool_end_to_end() {
        let warehouse = seeded_warehouse();
        let result = forecast_mrr(&warehouse, &PipelineConfig::with_seed(42)).unwrap();

        assert!(!result.trend_only);
        assert_eq!(result.forecast.len(), 4);
        assert!(result.report_text.contains("SITUATION"));
        assert!(result.report_text.contains("COMPLICATION"));
        let weight_sum: f64 = result.importance.iter().map(|f| f.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-6);

        // persisted output is readable through the read-back tools
        assert_eq!(get_latest_forecast(&warehouse).unwrap().predictions.len(), 4);
        assert_eq!(get_feature_importance(&warehouse).unwrap().features.len(), 8);
    }

    #[test]
    fn test_forecast_trend_tool_respects_weeks_param() {
        let warehouse = seeded_warehouse();
        let result = forecast_trend(
            &warehouse,
            &PipelineConfig::with_seed(42),
            ForecastTrendParams { weeks: Some(2) },
        )
        .unwrap();
        assert_eq!(result.points.len(), 2);
        assert!(result.baseline_mrr > 0.0);
    }

    #[test]
    fn test_readback_tools_on_empty_warehouse() {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        assert!(get_latest_forecast(&warehouse).unwrap().predictions.is_empty());
        assert!(get_feature_importance(&warehouse).unwrap().features.is_empty());
    }
}
