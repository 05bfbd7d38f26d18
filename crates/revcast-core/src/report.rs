//! SCQA report composition
//!
//! Combines current-state metrics, the trend forecast, lever importances,
//! and the externally prioritized action list into the four-section decision
//! report (Situation / Complication / Analysis / Actions).
//!
//! Composition is pure: given the same inputs (including the timestamp) it
//! always produces the same `Report`, byte for byte. Urgency of action deals
//! is decided upstream; this module only groups and renders it.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::levers::Lever;
use crate::models::{
    ActionDeal, ActionType, ForecastPoint, ImportanceReport, Report, WeeklyRecord,
};

/// Format a currency amount with thousands separators, e.g. `$120,500`
fn usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let rounded = amount.abs().round() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::new();
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Signed currency delta, e.g. `+$4,200` / `-$300`
fn usd_signed(amount: f64) -> String {
    if amount < 0.0 {
        usd(amount)
    } else {
        format!("+{}", usd(amount))
    }
}

/// Composes the four-section report
#[derive(Debug, Clone)]
pub struct ReportComposer {
    /// Importance share above which a dominant Deal Close lever reads as a
    /// conversion bottleneck (default 0.5)
    pub dominant_lever_threshold: f64,
}

impl Default for ReportComposer {
    fn default() -> Self {
        Self {
            dominant_lever_threshold: 0.5,
        }
    }
}

impl ReportComposer {
    pub fn new(dominant_lever_threshold: f64) -> Self {
        Self {
            dominant_lever_threshold,
        }
    }

    /// Compose the report from already-finalized stage outputs.
    ///
    /// `weeks` is the full weekly series (display audience - the first week
    /// without lag data is welcome here). `importance` is `None` in the
    /// trend-only fallback, in which case the Analysis section is omitted
    /// and the omission is stated rather than importances fabricated.
    pub fn compose(
        &self,
        weeks: &[WeeklyRecord],
        forecast: &[ForecastPoint],
        importance: Option<&ImportanceReport>,
        actions: &[ActionDeal],
        generated_at: DateTime<Utc>,
    ) -> Result<Report> {
        let latest = weeks.last().ok_or_else(|| {
            Error::InsufficientData("cannot compose a report without weekly records".into())
        })?;

        let mut warnings = Vec::new();
        if let Some(report) = importance {
            if let Some(warning) = &report.low_sample_warning {
                warnings.push(warning.clone());
            }
        } else {
            warnings.push(
                "importance model could not be fit; Analysis omitted (trend-only report)"
                    .to_string(),
            );
        }

        Ok(Report {
            situation: self.situation(latest, forecast),
            complication: self.complication(importance, forecast),
            analysis: importance.map(|report| self.analysis(report)),
            actions: self.actions(actions),
            generated_at,
            warnings,
        })
    }

    fn situation(&self, latest: &WeeklyRecord, forecast: &[ForecastPoint]) -> String {
        let wow_pct = match latest.mrr_lag1 {
            Some(prev) if prev != 0.0 => latest.mrr_change / prev * 100.0,
            _ => 0.0,
        };

        let mut out = format!(
            "Current MRR: {} (week of {})\n\
             Week-over-week: {} ({:+.1}%)\n\
             Win rate: {:.0}% | At-risk: {:.0}% ({} deals) | Open pipeline: {} deals",
            usd(latest.total_mrr),
            latest.week.format("%Y-%m-%d"),
            usd_signed(latest.mrr_change),
            wow_pct,
            latest.win_rate_pct,
            latest.at_risk_pct,
            latest.at_risk_deals,
            latest.pipeline_deals,
        );

        if let Some(first) = forecast.first() {
            out.push_str(&format!(
                "\n{}-week forecast (trend {}/week):",
                forecast.len(),
                usd_signed(first.weekly_trend)
            ));
            for point in forecast {
                out.push_str(&format!(
                    "\n  Week {} ({}): {} ({:+.1}%)",
                    point.week_offset,
                    point.forecast_week.format("%Y-%m-%d"),
                    usd(point.predicted_mrr),
                    point.change_pct,
                ));
            }
        }
        out
    }

    /// Exactly one sentence, for any valid importance distribution. The
    /// dominant lever is the highest aggregate weight, ties broken by lever
    /// declaration order.
    fn complication(
        &self,
        importance: Option<&ImportanceReport>,
        forecast: &[ForecastPoint],
    ) -> String {
        let Some(report) = importance else {
            let trend = forecast.first().map(|p| p.weekly_trend).unwrap_or(0.0);
            if trend < 0.0 {
                return format!(
                    "MRR is trending down {}/week and no lever ranking is available to explain the driver.",
                    usd(trend.abs())
                );
            }
            return "No lever ranking is available this run; the trajectory rests on the trend extrapolation alone.".to_string();
        };

        let dominant = report.dominant_lever();
        let share = dominant.weight * 100.0;

        if dominant.lever == Lever::DealClose && dominant.weight > self.dominant_lever_threshold {
            format!(
                "Deal Close drives {:.0}% of MRR movement: the bottleneck is converting the pipeline you already have, not filling it.",
                share
            )
        } else {
            format!(
                "{} is the dominant lever at {:.0}% of predicted MRR movement; pipeline and retention work there will move the number most.",
                dominant.lever.label(),
                share
            )
        }
    }

    fn analysis(&self, report: &ImportanceReport) -> String {
        let mut out = String::from("Lever importance (share of model attribution):\n");
        for lever_importance in &report.levers {
            out.push_str(&format!(
                "  {:<16} {:>5.1}%\n",
                lever_importance.lever.label(),
                lever_importance.weight * 100.0
            ));
        }
        out.push_str("Ranked features:\n");
        for feature in &report.features {
            out.push_str(&format!(
                "  {:>2}. [{:<15}] {:<20} {:>5.1}%\n",
                feature.rank,
                feature.lever.label(),
                feature.feature,
                feature.weight * 100.0
            ));
        }
        out.push_str(&format!("(trained on {} weeks)", report.training_rows));
        out
    }

    fn actions(&self, actions: &[ActionDeal]) -> String {
        let mut out = String::new();
        for (action_type, heading) in [
            (ActionType::Win, "DEALS TO WIN (urgent to close)"),
            (ActionType::Save, "DEALS TO SAVE (urgent to save)"),
            (ActionType::Nurture, "NURTURE"),
        ] {
            let mut bucket: Vec<&ActionDeal> =
                actions.iter().filter(|d| d.action == action_type).collect();
            bucket.sort_by_key(|deal| deal.priority);
            let total: f64 = bucket.iter().map(|deal| deal.mrr).sum();

            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!(
                "{} - {} deals, {}\n",
                heading,
                bucket.len(),
                usd(total)
            ));
            for deal in bucket {
                let velocity = deal
                    .velocity_days
                    .map(|d| format!("{} days", d))
                    .unwrap_or_else(|| "n/a".to_string());
                out.push_str(&format!(
                    "  - {}: {} | velocity: {} | region: {}\n",
                    deal.company_name,
                    usd(deal.mrr),
                    velocity,
                    deal.region.as_deref().unwrap_or("n/a"),
                ));
            }
        }
        out
    }
}
