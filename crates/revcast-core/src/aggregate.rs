//! Weekly aggregation of deal records
//!
//! Turns deal-level rows into one `WeeklyRecord` per calendar week with the
//! engineered lag/delta/percentage fields the lever model consumes. Weeks are
//! keyed by the Monday of the ISO week and are contiguous from the first to
//! the last event week in the input.
//!
//! Closed deals count in the week of their close date; open deals count
//! toward the pipeline from their created week onward. Percentage fields are
//! defined as 0 whenever their denominator is 0, so they are always finite.

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{DealRecord, DealStage, WeeklyRecord};

/// Monday of the ISO week containing `date`
pub fn week_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

/// Aggregate deal records into an ascending weekly series.
///
/// Fails with `InsufficientData` when the input spans fewer than two weeks:
/// no week-over-week delta is computable. The first week of the result has
/// `mrr_lag1 = None`; use [`modeling_rows`] to obtain the modeling-ready
/// subset.
pub fn aggregate_weeks(deals: &[DealRecord]) -> Result<Vec<WeeklyRecord>> {
    if deals.is_empty() {
        return Err(Error::InsufficientData("no deal records supplied".into()));
    }

    // A closed deal without a close date cannot be bucketed
    for deal in deals {
        if deal.stage.is_closed() && deal.close_date.is_none() {
            return Err(Error::InvalidData(format!(
                "deal {} is {} but has no close_date",
                deal.deal_id, deal.stage
            )));
        }
    }

    let mut first_week = NaiveDate::MAX;
    let mut last_week = NaiveDate::MIN;
    for deal in deals {
        let created = week_of(deal.created_date);
        first_week = first_week.min(created);
        last_week = last_week.max(created);
        if let Some(close) = deal.close_date {
            let closed = week_of(close);
            first_week = first_week.min(closed);
            last_week = last_week.max(closed);
        }
    }

    if first_week == last_week {
        return Err(Error::InsufficientData(format!(
            "only one week of activity ({}); at least two are required",
            first_week
        )));
    }

    let mut records = Vec::new();
    let mut cumulative_mrr = 0.0;
    let mut week = first_week;

    while week <= last_week {
        let week_end = week + Duration::days(6);

        let mut new_wins = 0i64;
        let mut losses = 0i64;
        let mut won_mrr = 0.0;
        let mut won_velocity_total = 0.0;
        let mut pipeline_deals = 0i64;
        let mut at_risk_deals = 0i64;

        for deal in deals {
            if let Some(close) = deal.close_date {
                if week_of(close) == week {
                    match deal.stage {
                        DealStage::ClosedWon => {
                            new_wins += 1;
                            won_mrr += deal.mrr;
                            won_velocity_total += deal.days_in_pipeline as f64;
                        }
                        DealStage::ClosedLost => losses += 1,
                        _ => {}
                    }
                }
            }

            let still_open = match deal.close_date {
                Some(close) => close > week_end,
                None => true,
            };
            if deal.created_date <= week_end && still_open {
                pipeline_deals += 1;
                if deal.is_at_risk {
                    at_risk_deals += 1;
                }
            }
        }

        cumulative_mrr += won_mrr;

        let pipeline_velocity = if new_wins > 0 {
            won_velocity_total / new_wins as f64
        } else {
            0.0
        };

        let (
            pipeline_growth,
            pipeline_growth_pct,
            at_risk_change,
            velocity_change,
            mrr_lag1,
            mrr_change,
        ) = match records.last() {
            Some(prev) => {
                let prev: &WeeklyRecord = prev;
                let growth = (pipeline_deals - prev.pipeline_deals) as f64;
                (
                    growth,
                    pct(growth, prev.pipeline_deals as f64),
                    (at_risk_deals - prev.at_risk_deals) as f64,
                    pipeline_velocity - prev.pipeline_velocity,
                    Some(prev.total_mrr),
                    cumulative_mrr - prev.total_mrr,
                )
            }
            None => (0.0, 0.0, 0.0, 0.0, None, 0.0),
        };

        records.push(WeeklyRecord {
            week,
            total_mrr: cumulative_mrr,
            pipeline_deals,
            pipeline_growth,
            pipeline_growth_pct,
            at_risk_deals,
            at_risk_change,
            at_risk_pct: pct(at_risk_deals as f64, pipeline_deals as f64),
            new_wins,
            win_rate_pct: pct(new_wins as f64, (new_wins + losses) as f64),
            pipeline_velocity,
            velocity_change,
            mrr_lag1,
            mrr_change,
        });

        week = week + Duration::days(7);
    }

    debug!(weeks = records.len(), "aggregated deal records");
    Ok(records)
}

/// The modeling-ready subset: weeks with a valid `mrr_lag1`. The first week
/// of a series is dropped here but stays in the full series for display.
pub fn modeling_rows(records: &[WeeklyRecord]) -> Vec<WeeklyRecord> {
    records
        .iter()
        .filter(|record| record.mrr_lag1.is_some())
        .cloned()
        .collect()
}

fn require_f64(row: &Value, field: &str) -> Result<f64> {
    match row.get(field) {
        None => Err(Error::SchemaMismatch(format!(
            "weekly row missing required column '{}'",
            field
        ))),
        // a present-but-null numeric input reads as 0, like every other
        // missing numeric input in this pipeline
        Some(Value::Null) => Ok(0.0),
        Some(value) => value.as_f64().ok_or_else(|| {
            Error::SchemaMismatch(format!("column '{}' is not numeric: {}", field, value))
        }),
    }
}

fn optional_f64(row: &Value, field: &str) -> Result<Option<f64>> {
    match row.get(field) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::SchemaMismatch(format!("column '{}' is not numeric", field))),
    }
}

/// Parse a pre-aggregated weekly row set (one JSON object per week) into
/// `WeeklyRecord`s. Absent required columns are a `SchemaMismatch`; an
/// explicit null in a numeric column reads as 0. `mrr_lag1` keeps its null
/// as `None` (first week of a series).
pub fn parse_weekly_rows(rows: &[Value]) -> Result<Vec<WeeklyRecord>> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let week_str = row
            .get("week")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::SchemaMismatch("weekly row missing 'week' column".into()))?;
        let week = NaiveDate::parse_from_str(week_str, "%Y-%m-%d")
            .map_err(|_| Error::InvalidData(format!("invalid week date: {}", week_str)))?;

        records.push(WeeklyRecord {
            week,
            total_mrr: require_f64(row, "total_mrr")?,
            pipeline_deals: require_f64(row, "pipeline_deals")? as i64,
            pipeline_growth: require_f64(row, "pipeline_growth")?,
            pipeline_growth_pct: require_f64(row, "pipeline_growth_pct")?,
            at_risk_deals: require_f64(row, "at_risk_deals")? as i64,
            at_risk_change: require_f64(row, "at_risk_change")?,
            at_risk_pct: require_f64(row, "at_risk_pct")?,
            new_wins: require_f64(row, "new_wins")? as i64,
            win_rate_pct: require_f64(row, "win_rate_pct")?,
            pipeline_velocity: require_f64(row, "pipeline_velocity")?,
            velocity_change: require_f64(row, "velocity_change")?,
            mrr_lag1: optional_f64(row, "mrr_lag1")?,
            mrr_change: require_f64(row, "mrr_change")?,
        });
    }
    records.sort_by_key(|record| record.week);
    Ok(records)
}
