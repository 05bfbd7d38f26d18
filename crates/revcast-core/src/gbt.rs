//! Gradient-boosted regression trees
//!
//! A small, fully deterministic boosting implementation for ranking feature
//! importance on short weekly series. Squared-error loss, depth-bounded
//! greedy trees, constant learning rate. Importance is the total
//! squared-error reduction (gain) attributed to each feature across every
//! split in the ensemble.
//!
//! Determinism contract: features are scanned in index order and a split
//! must be strictly better to replace the incumbent, so exact ties resolve
//! to the lowest feature index. The only randomness is optional row
//! subsampling, driven by an explicitly seeded RNG.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

/// Hyperparameters for the boosted ensemble
#[derive(Debug, Clone)]
pub struct GbtParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows sampled (without replacement) per tree; 1.0 disables
    /// subsampling
    pub subsample: f64,
    /// Seed for the subsampling RNG; required so runs are reproducible
    pub seed: u64,
}

impl GbtParams {
    /// Shallow ensemble sized for small weekly samples
    pub fn shallow(seed: u64) -> Self {
        Self {
            n_trees: 100,
            max_depth: 3,
            learning_rate: 0.1,
            subsample: 1.0,
            seed,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One regression tree, stored as a flat node arena
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sum of squared errors around the mean of the indexed targets
fn sse(targets: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let mu = indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64;
    indices
        .iter()
        .map(|&i| {
            let d = targets[i] - mu;
            d * d
        })
        .sum()
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn best_split(rows: &[Vec<f64>], targets: &[f64], indices: &[usize]) -> Option<SplitCandidate> {
    if indices.len() < 2 {
        return None;
    }
    let parent_sse = sse(targets, indices);
    if parent_sse == 0.0 {
        return None;
    }

    let n_features = rows[indices[0]].len();
    let mut best: Option<SplitCandidate> = None;

    for feature in 0..n_features {
        let mut values: Vec<f64> = indices.iter().map(|&i| rows[i][feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        if values.len() < 2 {
            continue;
        }

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| rows[i][feature] <= threshold);
            if left.is_empty() || right.is_empty() {
                continue;
            }
            let gain = parent_sse - sse(targets, &left) - sse(targets, &right);
            let improves = match &best {
                Some(incumbent) => gain > incumbent.gain,
                None => gain > 0.0,
            };
            if improves {
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                    left,
                    right,
                });
            }
        }
    }

    best
}

fn grow(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    nodes: &mut Vec<Node>,
    gains: &mut [f64],
) -> usize {
    let leaf_value = mean(&indices.iter().map(|&i| targets[i]).collect::<Vec<f64>>());

    if depth >= max_depth {
        nodes.push(Node::Leaf { value: leaf_value });
        return nodes.len() - 1;
    }

    match best_split(rows, targets, &indices) {
        Some(split) => {
            gains[split.feature] += split.gain;
            let slot = nodes.len();
            // placeholder, patched once children exist
            nodes.push(Node::Leaf { value: leaf_value });
            let left = grow(rows, targets, split.left, depth + 1, max_depth, nodes, gains);
            let right = grow(rows, targets, split.right, depth + 1, max_depth, nodes, gains);
            nodes[slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            slot
        }
        None => {
            nodes.push(Node::Leaf { value: leaf_value });
            nodes.len() - 1
        }
    }
}

/// A fitted gradient-boosted ensemble
#[derive(Debug)]
pub struct GradientBoostedTrees {
    params: GbtParams,
    base_prediction: f64,
    trees: Vec<Tree>,
    /// Unnormalized total gain per feature
    feature_gains: Vec<f64>,
}

impl GradientBoostedTrees {
    /// Fit the ensemble on `rows` (one Vec per sample) against `targets`.
    ///
    /// Fails with `ModelFit` when there are fewer than 2 rows, the target
    /// has zero variance, or (rows/targets) lengths disagree.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], params: GbtParams) -> Result<Self> {
        if rows.len() != targets.len() {
            return Err(Error::ModelFit(format!(
                "feature matrix has {} rows but target has {}",
                rows.len(),
                targets.len()
            )));
        }
        if rows.len() < 2 {
            return Err(Error::ModelFit(format!(
                "need at least 2 training rows, got {}",
                rows.len()
            )));
        }
        let target_mean = mean(targets);
        let variance = targets
            .iter()
            .map(|y| (y - target_mean) * (y - target_mean))
            .sum::<f64>();
        if variance == 0.0 {
            return Err(Error::ModelFit(
                "target has zero variance; feature importance is undefined".into(),
            ));
        }

        let n_features = rows[0].len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut feature_gains = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(params.n_trees);
        let mut predictions = vec![target_mean; rows.len()];

        let all_indices: Vec<usize> = (0..rows.len()).collect();
        let sample_size = ((rows.len() as f64) * params.subsample).round().max(2.0) as usize;
        let sample_size = sample_size.min(rows.len());

        for _ in 0..params.n_trees {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();

            let indices = if sample_size < rows.len() {
                let mut sampled = all_indices.clone();
                sampled.shuffle(&mut rng);
                sampled.truncate(sample_size);
                sampled.sort_unstable();
                sampled
            } else {
                all_indices.clone()
            };

            let mut nodes = Vec::new();
            grow(
                rows,
                &residuals,
                indices,
                0,
                params.max_depth,
                &mut nodes,
                &mut feature_gains,
            );
            let tree = Tree { nodes };

            for (prediction, row) in predictions.iter_mut().zip(rows) {
                *prediction += params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            params,
            base_prediction: target_mean,
            trees,
            feature_gains,
        })
    }

    /// Predict a single row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base_prediction
            + self
                .trees
                .iter()
                .map(|tree| self.params.learning_rate * tree.predict(row))
                .sum::<f64>()
    }

    /// Gain-based importance, normalized to sum to 1 across features.
    ///
    /// Returns `ModelFit` if no split in the whole ensemble produced gain
    /// (every feature constant), since a normalized distribution is then
    /// undefined.
    pub fn feature_importances(&self) -> Result<Vec<f64>> {
        let total: f64 = self.feature_gains.iter().sum();
        if total <= 0.0 {
            return Err(Error::ModelFit(
                "no informative splits; feature importance is undefined".into(),
            ));
        }
        Ok(self.feature_gains.iter().map(|g| g / total).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y depends only on the first feature
    fn single_signal_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![i as f64, 5.0, (i % 2) as f64 * 0.001])
            .collect();
        let targets: Vec<f64> = (0..10).map(|i| 3.0 * i as f64 + 10.0).collect();
        (rows, targets)
    }

    #[test]
    fn test_fit_learns_monotone_signal() {
        let (rows, targets) = single_signal_data();
        let model = GradientBoostedTrees::fit(&rows, &targets, GbtParams::shallow(42)).unwrap();
        // With 100 trees at lr 0.1 the ensemble should track the line closely
        let prediction = model.predict(&[4.0, 5.0, 0.0]);
        assert!((prediction - 22.0).abs() < 2.0, "prediction was {}", prediction);
    }

    #[test]
    fn test_importance_concentrates_on_signal_feature() {
        let (rows, targets) = single_signal_data();
        let model = GradientBoostedTrees::fit(&rows, &targets, GbtParams::shallow(42)).unwrap();
        let importances = model.feature_importances().unwrap();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > 0.9, "importances: {:?}", importances);
        // constant feature never splits
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_reproducible_with_same_seed() {
        let (rows, targets) = single_signal_data();
        let mut params = GbtParams::shallow(7);
        params.subsample = 0.8;
        let a = GradientBoostedTrees::fit(&rows, &targets, params.clone())
            .unwrap()
            .feature_importances()
            .unwrap();
        let b = GradientBoostedTrees::fit(&rows, &targets, params)
            .unwrap()
            .feature_importances()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_variance_target_rejected() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![5.0, 5.0, 5.0];
        let err = GradientBoostedTrees::fit(&rows, &targets, GbtParams::shallow(1)).unwrap_err();
        assert!(matches!(err, Error::ModelFit(_)));
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let rows = vec![vec![1.0]];
        let targets = vec![5.0];
        assert!(matches!(
            GradientBoostedTrees::fit(&rows, &targets, GbtParams::shallow(1)),
            Err(Error::ModelFit(_))
        ));
    }

    #[test]
    fn test_constant_features_varying_target_rejected_at_importance() {
        let rows = vec![vec![1.0, 2.0]; 4];
        let targets = vec![1.0, 2.0, 3.0, 4.0];
        let model = GradientBoostedTrees::fit(&rows, &targets, GbtParams::shallow(1)).unwrap();
        assert!(matches!(model.feature_importances(), Err(Error::ModelFit(_))));
    }
}
