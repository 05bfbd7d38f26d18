//! Pipeline orchestration
//!
//! One invocation is a single sequential batch: load deals, aggregate weeks,
//! fit forecast and importance, compose the report, then persist the two
//! output tables. No stage starts before its predecessor's full output is
//! available, and any fatal error aborts the run before anything is written
//! (fail-fast, no partial output).
//!
//! `ModelFit` from the importance ranker is the one recoverable failure: the
//! run degrades to a trend-only report and the previously persisted
//! importance table is left untouched.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::aggregate::{aggregate_weeks, modeling_rows};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::forecast::TrendForecaster;
use crate::importance::ImportanceRanker;
use crate::models::{ForecastPoint, ImportanceReport, Report, WeeklyRecord};
use crate::report::ReportComposer;
use crate::warehouse::Warehouse;

/// Everything a pipeline run produces
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: Report,
    /// Full weekly series (display audience, first week included)
    pub weekly: Vec<WeeklyRecord>,
    pub forecast: Vec<ForecastPoint>,
    /// None when the run degraded to trend-only
    pub importance: Option<ImportanceReport>,
}

/// The weekly forecast pipeline, scoped to one invocation
pub struct ForecastPipeline<'a> {
    config: PipelineConfig,
    warehouse: &'a dyn Warehouse,
}

impl<'a> ForecastPipeline<'a> {
    pub fn new(config: PipelineConfig, warehouse: &'a dyn Warehouse) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, warehouse })
    }

    /// Run the full pipeline and persist both output tables.
    ///
    /// `run_at` stamps the persisted rows and the report, and is passed in
    /// so a run is a pure function of its inputs.
    pub fn run(&self, run_at: DateTime<Utc>) -> Result<PipelineOutcome> {
        let deals = self.warehouse.load_deals()?;
        info!(deals = deals.len(), "loaded deal records");

        let weekly = aggregate_weeks(&deals)?;
        let modeling = modeling_rows(&weekly);

        let forecaster =
            TrendForecaster::new(self.config.trend_window_size, self.config.forecast_horizon);
        let forecast = forecaster.forecast(&modeling)?;

        let importance = match ImportanceRanker::from_config(&self.config).rank(&modeling) {
            Ok(report) => Some(report),
            Err(Error::ModelFit(cause)) => {
                warn!(%cause, "importance ranking skipped; falling back to trend-only report");
                None
            }
            Err(other) => return Err(other),
        };

        let actions = self.warehouse.load_actions()?;

        let composer = ReportComposer::new(self.config.dominant_lever_threshold);
        let report = composer.compose(
            &weekly,
            &forecast,
            importance.as_ref(),
            &actions,
            run_at,
        )?;

        // All stages succeeded - only now touch the output tables
        self.warehouse.replace_predictions(&forecast, run_at)?;
        if let Some(importance_report) = &importance {
            self.warehouse
                .replace_importances(&importance_report.features, run_at)?;
        }

        info!(
            weeks = weekly.len(),
            horizon = forecast.len(),
            trend_only = importance.is_none(),
            "pipeline run complete"
        );

        Ok(PipelineOutcome {
            report,
            weekly,
            forecast,
            importance,
        })
    }

    /// Quick trend forecast: no model fit, no persistence.
    ///
    /// `weeks` overrides the configured horizon when given.
    pub fn run_trend_forecast(&self, weeks: Option<usize>) -> Result<Vec<ForecastPoint>> {
        let deals = self.warehouse.load_deals()?;
        let weekly = aggregate_weeks(&deals)?;
        let modeling = modeling_rows(&weekly);

        let horizon = weeks.unwrap_or(self.config.forecast_horizon);
        TrendForecaster::new(self.config.trend_window_size, horizon).forecast(&modeling)
    }
}
