//! Trend-based MRR forecast
//!
//! Deliberately simple extrapolation: the average `mrr_change` over a short
//! trailing window, applied repeatedly from the last observed MRR. With only
//! 10-20 weeks of history a learned time-series model would overfit, so the
//! design favors interpretability and stability over accuracy. No confidence
//! intervals, no seasonality.

use chrono::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ForecastPoint, WeeklyRecord};

/// Short-horizon trend forecaster
#[derive(Debug, Clone)]
pub struct TrendForecaster {
    /// Trailing weeks averaged for the per-week delta (default 4)
    pub window_size: usize,
    /// Weeks to forecast forward (default 4)
    pub horizon: usize,
}

impl Default for TrendForecaster {
    fn default() -> Self {
        Self {
            window_size: 4,
            horizon: 4,
        }
    }
}

impl TrendForecaster {
    pub fn new(window_size: usize, horizon: usize) -> Self {
        Self {
            window_size,
            horizon,
        }
    }

    /// Mean `mrr_change` over the last `window_size` records. When fewer
    /// records are available, all of them are used.
    pub fn avg_change(&self, records: &[WeeklyRecord]) -> Result<f64> {
        if records.is_empty() {
            return Err(Error::InsufficientData(
                "no weekly records to compute a trend from".into(),
            ));
        }
        let window = self.window_size.min(records.len());
        let tail = &records[records.len() - window..];
        Ok(tail.iter().map(|record| record.mrr_change).sum::<f64>() / window as f64)
    }

    /// Extrapolate `horizon` weeks forward from the last observed week.
    ///
    /// `predicted[i] = predicted[i-1] + avg_change`, seeded from the last
    /// `total_mrr`. A zero trend yields a flat forecast, which is valid
    /// output. Deterministic for identical input and window size.
    pub fn forecast(&self, records: &[WeeklyRecord]) -> Result<Vec<ForecastPoint>> {
        let avg_change = self.avg_change(records)?;
        // avg_change errors on empty input, so last() is present here
        let last = records.last().ok_or_else(|| {
            Error::InsufficientData("no weekly records to forecast from".into())
        })?;
        let baseline = last.total_mrr;

        debug!(
            baseline,
            weekly_trend = avg_change,
            horizon = self.horizon,
            "running trend forecast"
        );

        let mut points = Vec::with_capacity(self.horizon);
        let mut predicted = baseline;
        for offset in 1..=self.horizon {
            predicted += avg_change;
            let change_pct = if baseline == 0.0 {
                0.0
            } else {
                (predicted - baseline) / baseline * 100.0
            };
            points.push(ForecastPoint {
                week_offset: offset,
                forecast_week: last.week + Duration::weeks(offset as i64),
                predicted_mrr: predicted,
                baseline_mrr: baseline,
                weekly_trend: avg_change,
                change_pct,
            });
        }
        Ok(points)
    }
}
