//! Business lever taxonomy and feature selection
//!
//! The grouping of weekly features into levers is a fixed, documented
//! business taxonomy, not something inferred from data:
//!
//! 1. Pipeline Growth -> pipeline_growth, pipeline_growth_pct
//! 2. At Risk         -> at_risk_change, at_risk_pct
//! 3. Deal Close      -> new_wins, velocity_change, win_rate_pct
//! 4. Trend           -> mrr_lag1
//!
//! Declaration order doubles as the tie-break order wherever levers compete.

use serde::{Deserialize, Serialize};

use crate::models::WeeklyRecord;

/// A named group of business features believed to drive MRR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lever {
    PipelineGrowth,
    AtRisk,
    DealClose,
    Trend,
}

impl Lever {
    /// All levers in declaration (tie-break) order
    pub fn all() -> [Lever; 4] {
        [Self::PipelineGrowth, Self::AtRisk, Self::DealClose, Self::Trend]
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::PipelineGrowth => "Pipeline Growth",
            Self::AtRisk => "At Risk",
            Self::DealClose => "Deal Close",
            Self::Trend => "Trend",
        }
    }

    /// Member features, in fixed order
    pub fn features(&self) -> &'static [&'static str] {
        match self {
            Self::PipelineGrowth => &["pipeline_growth", "pipeline_growth_pct"],
            Self::AtRisk => &["at_risk_change", "at_risk_pct"],
            Self::DealClose => &["new_wins", "velocity_change", "win_rate_pct"],
            Self::Trend => &["mrr_lag1"],
        }
    }

    /// Which lever a feature column belongs to
    pub fn for_feature(name: &str) -> Option<Lever> {
        Self::all()
            .into_iter()
            .find(|lever| lever.features().contains(&name))
    }

    /// Stable identifier used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PipelineGrowth => "pipeline_growth",
            Self::AtRisk => "at_risk",
            Self::DealClose => "deal_close",
            Self::Trend => "trend",
        }
    }
}

impl std::str::FromStr for Lever {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pipeline_growth" => Ok(Self::PipelineGrowth),
            "at_risk" => Ok(Self::AtRisk),
            "deal_close" => Ok(Self::DealClose),
            "trend" => Ok(Self::Trend),
            _ => Err(format!("Unknown lever: {}", s)),
        }
    }
}

impl std::fmt::Display for Lever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The model feature columns, lever by lever in declaration order
pub fn feature_columns() -> Vec<&'static str> {
    Lever::all()
        .into_iter()
        .flat_map(|lever| lever.features().iter().copied())
        .collect()
}

/// Extract one feature value from a weekly record by column name.
///
/// `mrr_lag1` reads as 0 when absent; callers feeding the model are expected
/// to pass modeling-ready rows where the lag is always present.
pub fn feature_value(record: &WeeklyRecord, name: &str) -> Option<f64> {
    match name {
        "pipeline_growth" => Some(record.pipeline_growth),
        "pipeline_growth_pct" => Some(record.pipeline_growth_pct),
        "at_risk_change" => Some(record.at_risk_change),
        "at_risk_pct" => Some(record.at_risk_pct),
        "new_wins" => Some(record.new_wins as f64),
        "velocity_change" => Some(record.velocity_change),
        "win_rate_pct" => Some(record.win_rate_pct),
        "mrr_lag1" => Some(record.mrr_lag1.unwrap_or(0.0)),
        _ => None,
    }
}

/// Build the training matrix from modeling-ready weekly records: one row per
/// week over `feature_columns()`, target = `total_mrr`.
pub fn feature_matrix(records: &[WeeklyRecord]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let columns = feature_columns();
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                // All names come from feature_columns(), so lookups cannot miss
                .map(|name| feature_value(record, name).unwrap_or(0.0))
                .collect()
        })
        .collect();
    let target = records.iter().map(|record| record.total_mrr).collect();
    (rows, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_week() -> WeeklyRecord {
        WeeklyRecord {
            week: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            total_mrr: 120_000.0,
            pipeline_deals: 40,
            pipeline_growth: 3.0,
            pipeline_growth_pct: 8.1,
            at_risk_deals: 5,
            at_risk_change: -1.0,
            at_risk_pct: 12.5,
            new_wins: 2,
            win_rate_pct: 66.7,
            pipeline_velocity: 21.0,
            velocity_change: -2.0,
            mrr_lag1: Some(115_000.0),
            mrr_change: 5_000.0,
        }
    }

    #[test]
    fn test_taxonomy_is_fixed() {
        assert_eq!(feature_columns().len(), 8);
        assert_eq!(Lever::for_feature("win_rate_pct"), Some(Lever::DealClose));
        assert_eq!(Lever::for_feature("mrr_lag1"), Some(Lever::Trend));
        assert_eq!(Lever::for_feature("nope"), None);
    }

    #[test]
    fn test_declaration_order() {
        let order: Vec<&str> = Lever::all().iter().map(|l| l.label()).collect();
        assert_eq!(order, vec!["Pipeline Growth", "At Risk", "Deal Close", "Trend"]);
    }

    #[test]
    fn test_feature_matrix_shape_and_target() {
        let week = sample_week();
        let (rows, target) = feature_matrix(&[week.clone()]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 8);
        assert_eq!(target, vec![120_000.0]);
        // mrr_lag1 is the last column (Trend comes last in declaration order)
        assert_eq!(rows[0][7], 115_000.0);
    }

    #[test]
    fn test_feature_value_covers_all_columns() {
        let week = sample_week();
        for name in feature_columns() {
            assert!(feature_value(&week, name).is_some(), "missing {}", name);
        }
    }
}
