//! Domain models for Revcast

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Sales pipeline stage for a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Prospect,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prospect => "prospect",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
        }
    }

    /// Closed stages leave the open pipeline
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ClosedWon | Self::ClosedLost)
    }
}

impl std::str::FromStr for DealStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prospect" => Ok(Self::Prospect),
            "qualified" => Ok(Self::Qualified),
            "proposal" => Ok(Self::Proposal),
            "negotiation" => Ok(Self::Negotiation),
            "closed_won" | "won" => Ok(Self::ClosedWon),
            "closed_lost" | "lost" => Ok(Self::ClosedLost),
            _ => Err(format!("Unknown deal stage: {}", s)),
        }
    }
}

impl std::fmt::Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deal-level transactional record. Immutable pipeline input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealRecord {
    pub deal_id: String,
    pub company_name: String,
    /// Monthly recurring revenue of the deal, non-negative
    pub mrr: f64,
    pub stage: DealStage,
    /// Set once the deal reaches a closed stage
    pub close_date: Option<NaiveDate>,
    pub created_date: NaiveDate,
    pub region: String,
    pub is_at_risk: bool,
    pub days_in_pipeline: u32,
}

/// One aggregated week of pipeline activity with engineered lag/delta
/// fields. Keyed by `week` (the Monday of the ISO week), unique and
/// chronologically ordered within a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecord {
    pub week: NaiveDate,
    /// Cumulative won MRR through this week
    pub total_mrr: f64,
    /// Deals still open at the end of the week
    pub pipeline_deals: i64,
    /// WoW change in open pipeline count
    pub pipeline_growth: f64,
    pub pipeline_growth_pct: f64,
    /// Open deals flagged at risk
    pub at_risk_deals: i64,
    /// WoW change in at-risk count
    pub at_risk_change: f64,
    /// At-risk share of the open pipeline, 0 when the pipeline is empty
    pub at_risk_pct: f64,
    /// Deals won this week
    pub new_wins: i64,
    /// Wins as a share of this week's closed deals, 0 when nothing closed
    pub win_rate_pct: f64,
    /// Mean days-in-pipeline of this week's wins, 0 when there were none
    pub pipeline_velocity: f64,
    pub velocity_change: f64,
    /// Previous week's `total_mrr`; None only on the first week of a series
    pub mrr_lag1: Option<f64>,
    /// WoW change in `total_mrr` (0 on the first week)
    pub mrr_change: f64,
}

/// A single forecast step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 1-based number of weeks ahead of the last observed week
    pub week_offset: usize,
    pub forecast_week: NaiveDate,
    pub predicted_mrr: f64,
    /// Last observed `total_mrr` the extrapolation was seeded from
    pub baseline_mrr: f64,
    /// Average weekly change applied per step
    pub weekly_trend: f64,
    /// Change vs baseline, 0 when the baseline is 0
    pub change_pct: f64,
}

/// Normalized importance weight for a single model feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Normalized weight; across all features these sum to 1
    pub weight: f64,
    pub lever: crate::levers::Lever,
    /// 1-based rank by descending weight
    pub rank: usize,
}

/// Aggregated importance share for one lever group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverImportance {
    pub lever: crate::levers::Lever,
    /// Sum of member-feature weights
    pub weight: f64,
}

/// Output of a successful importance-ranking run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceReport {
    /// Per-feature weights, ranked by descending weight
    pub features: Vec<FeatureImportance>,
    /// Per-lever aggregates in lever declaration order
    pub levers: Vec<LeverImportance>,
    /// Number of training rows the model saw
    pub training_rows: usize,
    /// Set when `training_rows` fell below the configured threshold
    pub low_sample_warning: Option<String>,
}

impl ImportanceReport {
    /// The lever with the highest aggregate weight. Exact ties resolve by
    /// lever declaration order, so this is total and deterministic.
    pub fn dominant_lever(&self) -> LeverImportance {
        let mut best = self.levers[0].clone();
        for candidate in &self.levers[1..] {
            if candidate.weight > best.weight {
                best = candidate.clone();
            }
        }
        best
    }
}

/// Urgency bucket for an externally prioritized deal. The caller decides
/// urgency; Revcast only groups and renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    /// Urgent to close
    Win,
    /// Urgent to save
    Save,
    /// Keep warm, no urgent move
    Nurture,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win => "WIN",
            Self::Save => "SAVE",
            Self::Nurture => "NURTURE",
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WIN" => Ok(Self::Win),
            "SAVE" => Ok(Self::Save),
            "NURTURE" => Ok(Self::Nurture),
            _ => Err(format!("Unknown action type: {}", s)),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deal from the external next-best-action row set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDeal {
    pub company_name: String,
    pub mrr: f64,
    pub action: ActionType,
    /// Lower is more urgent; ordering within a bucket is preserved
    pub priority: i64,
    pub velocity_days: Option<u32>,
    pub region: Option<String>,
}

/// The composed four-section decision report (SCQA structure). Generated
/// once per invocation and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Current MRR, WoW delta, and the forecast trajectory
    pub situation: String,
    /// Exactly one derived sentence naming the dominant lever
    pub complication: String,
    /// Ranked lever-importance table; None in the trend-only fallback
    pub analysis: Option<String>,
    /// Action list grouped by urgency bucket
    pub actions: String,
    pub generated_at: DateTime<Utc>,
    /// Non-fatal notes (low-sample warning, analysis omission)
    pub warnings: Vec<String>,
}

impl Report {
    /// Render the full report as display text. Deterministic for a given
    /// report value.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("WEEKLY MRR FORECAST\n");
        out.push_str("===================\n\n");
        out.push_str("SITUATION\n");
        out.push_str(&self.situation);
        out.push_str("\n\nCOMPLICATION\n");
        out.push_str(&self.complication);
        out.push_str("\n\nANALYSIS\n");
        match &self.analysis {
            Some(analysis) => out.push_str(analysis),
            None => out.push_str("(omitted: importance model could not be fit; trend-only report)"),
        }
        out.push_str("\n\nACTIONS\n");
        out.push_str(&self.actions);
        if !self.warnings.is_empty() {
            out.push_str("\n\nNOTES\n");
            for warning in &self.warnings {
                out.push_str("- ");
                out.push_str(warning);
                out.push('\n');
            }
        }
        out
    }
}
