//! Lever importance ranking
//!
//! Fits the shallow boosted-tree ensemble over the lever features (target =
//! `total_mrr`), normalizes per-feature importance to sum to 1, and
//! aggregates per-lever importance as the sum of member-feature weights.

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::gbt::{GbtParams, GradientBoostedTrees};
use crate::levers::{feature_matrix, Lever};
use crate::models::{FeatureImportance, ImportanceReport, LeverImportance, WeeklyRecord};

/// Ranks lever features by predictive importance for `total_mrr`
#[derive(Debug, Clone)]
pub struct ImportanceRanker {
    params: GbtParams,
    low_sample_threshold: usize,
}

impl ImportanceRanker {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            params: GbtParams::shallow(config.random_seed),
            low_sample_threshold: config.low_sample_warning_threshold,
        }
    }

    /// Fit on modeling-ready weekly records and produce the ranked report.
    ///
    /// Fails with `ModelFit` when the training input is degenerate (fewer
    /// than 2 rows, zero target variance, or no informative feature). Below
    /// `low_sample_threshold` rows the run succeeds but carries a warning so
    /// downstream consumers can flag low confidence.
    pub fn rank(&self, records: &[WeeklyRecord]) -> Result<ImportanceReport> {
        let (rows, targets) = feature_matrix(records);
        let training_rows = rows.len();

        let low_sample_warning = if training_rows < self.low_sample_threshold {
            let message = format!(
                "importance model trained on only {} weeks (threshold {}); treat rankings as low confidence",
                training_rows, self.low_sample_threshold
            );
            warn!("{}", message);
            Some(message)
        } else {
            None
        };

        let model = GradientBoostedTrees::fit(&rows, &targets, self.params.clone())?;
        let weights = model.feature_importances()?;

        // Columns are laid out lever by lever in declaration order, exactly
        // as feature_matrix builds them
        let mut features: Vec<FeatureImportance> = Lever::all()
            .into_iter()
            .flat_map(|lever| lever.features().iter().map(move |&name| (lever, name)))
            .zip(&weights)
            .map(|((lever, name), &weight)| FeatureImportance {
                feature: name.to_string(),
                weight,
                lever,
                rank: 0,
            })
            .collect();

        // Descending weight; stable sort keeps declaration order on ties
        features.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (index, feature) in features.iter_mut().enumerate() {
            feature.rank = index + 1;
        }

        let levers = Lever::all()
            .into_iter()
            .map(|lever| LeverImportance {
                lever,
                weight: features
                    .iter()
                    .filter(|f| f.lever == lever)
                    .map(|f| f.weight)
                    .sum(),
            })
            .collect();

        debug!(training_rows, "ranked lever importance");

        Ok(ImportanceReport {
            features,
            levers,
            training_rows,
            low_sample_warning,
        })
    }
}
