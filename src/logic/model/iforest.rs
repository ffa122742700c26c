//! Isolation Forest - Unsupervised outlier scorer
//!
//! Random axis-aligned splits isolate outliers in fewer steps than normal
//! points. The score of a row is `-(2^(-E[h(x)] / c(psi)))`, in (-1, 0):
//! values near -1 are isolated quickly (anomalous), values near -0.5 and
//! above look like the training data.

use std::path::Path;
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::BASELINE_CONTAMINATION;
use super::artifact::{read_artifact, write_artifact};
use super::scorer::{Scorer, ScorerError};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    /// Sub-sample size per tree, capped at the training set size
    pub max_samples: usize,
    /// Expected outlier fraction; sets the decision offset
    pub contamination: f64,
    pub random_state: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: BASELINE_CONTAMINATION,
            random_state: 0,
        }
    }
}

impl IsolationForestParams {
    fn validate(&self) -> Result<(), ScorerError> {
        if self.n_estimators == 0 {
            return Err(ScorerError::InvalidParams("n_estimators must be > 0".to_string()));
        }
        if self.max_samples == 0 {
            return Err(ScorerError::InvalidParams("max_samples must be > 0".to_string()));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ScorerError::InvalidParams(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

// ============================================================================
// TREES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsolationNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(samples: &Array2<f64>, rows: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow(samples, rows, 0, max_depth, rng),
        }
    }

    /// Depth at which `row` lands, adjusted for unsplit leaf mass
    fn path_length(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                IsolationNode::Leaf { size } => return depth + average_path_length(*size),
                IsolationNode::Split { feature, threshold, left, right } => {
                    node = if row[*feature] < *threshold { &**left } else { &**right };
                    depth += 1.0;
                }
            }
        }
    }
}

fn grow(
    samples: &Array2<f64>,
    rows: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> IsolationNode {
    if depth >= max_depth || rows.len() <= 1 {
        return IsolationNode::Leaf { size: rows.len() };
    }

    // Only features that still vary inside this node can split it
    let candidates: Vec<(usize, f64, f64)> = (0..samples.ncols())
        .filter_map(|feature| {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                let v = samples[[r, feature]];
                (lo.min(v), hi.max(v))
            });
            (lo < hi).then_some((feature, lo, hi))
        })
        .collect();

    if candidates.is_empty() {
        return IsolationNode::Leaf { size: rows.len() };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);

    let (left, right): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&r| samples[[r, feature]] < threshold);

    IsolationNode::Split {
        feature,
        threshold,
        left: Box::new(grow(samples, left, depth + 1, max_depth, rng)),
        right: Box::new(grow(samples, right, depth + 1, max_depth, rng)),
    }
}

/// Expected path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    params: IsolationForestParams,
    n_features: usize,
    sample_size: usize,
    trees: Vec<IsolationTree>,
    /// Training-score quantile at `contamination`
    offset: f64,
}

impl IsolationForest {
    pub fn new(params: IsolationForestParams) -> Self {
        Self {
            params,
            n_features: 0,
            sample_size: 0,
            trees: Vec::new(),
            offset: -0.5,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn score_row(&self, row: ArrayView1<f64>) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
            / self.trees.len() as f64;
        let normalizer = average_path_length(self.sample_size).max(f64::EPSILON);
        -(2f64.powf(-mean_path / normalizer))
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(IsolationForestParams::default())
    }
}

fn check_finite(samples: &Array2<f64>) -> Result<(), ScorerError> {
    for (i, row) in samples.rows().into_iter().enumerate() {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ScorerError::NonFiniteInput { row: i });
        }
    }
    Ok(())
}

/// Linear-interpolated quantile of an ascending slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

impl Scorer for IsolationForest {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn fit(&mut self, samples: &Array2<f64>) -> Result<(), ScorerError> {
        self.params.validate()?;
        let n = samples.nrows();
        if n == 0 || samples.ncols() == 0 {
            return Err(ScorerError::EmptyTrainingSet);
        }
        check_finite(samples)?;

        let psi = self.params.max_samples.min(n);
        let max_depth = (psi.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.params.random_state);

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let rows = rand::seq::index::sample(&mut rng, n, psi).into_vec();
                IsolationTree::build(samples, rows, max_depth, &mut rng)
            })
            .collect();
        self.n_features = samples.ncols();
        self.sample_size = psi;

        let mut training_scores = self.score(samples)?;
        training_scores.sort_by(|a, b| a.total_cmp(b));
        self.offset = quantile(&training_scores, self.params.contamination);

        log::debug!(
            "Isolation forest fitted: {} trees, psi={}, depth<={}, offset={:.4}",
            self.trees.len(), psi, max_depth, self.offset
        );
        Ok(())
    }

    fn score(&self, samples: &Array2<f64>) -> Result<Vec<f64>, ScorerError> {
        if !self.is_fitted() {
            return Err(ScorerError::NotFitted);
        }
        if samples.ncols() != self.n_features {
            return Err(ScorerError::ShapeMismatch {
                expected: self.n_features,
                actual: samples.ncols(),
            });
        }
        check_finite(samples)?;

        Ok(samples.rows().into_iter().map(|row| self.score_row(row)).collect())
    }

    fn save(&self, path: &Path) -> Result<(), ScorerError> {
        if !self.is_fitted() {
            return Err(ScorerError::NotFitted);
        }
        write_artifact(path, self.name(), self)
    }

    fn load(path: &Path) -> Result<Self, ScorerError> {
        let artifact = read_artifact::<IsolationForest>(path)?;
        let forest = artifact.model;
        if !forest.is_fitted() {
            return Err(ScorerError::NotFitted);
        }
        log::info!(
            "Loaded {} ({} trees, offset={:.4}) trained at {}",
            artifact.algorithm, forest.trees.len(), forest.offset, artifact.trained_at
        );
        Ok(forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cluster() -> Array2<f64> {
        // Tight grid around (10, 10)
        let mut data = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                data.push(10.0 + i as f64 * 0.1);
                data.push(10.0 + j as f64 * 0.1);
            }
        }
        Array2::from_shape_vec((100, 2), data).unwrap()
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) is about 10.24
        assert!((average_path_length(256) - 10.24).abs() < 0.01);
    }

    #[test]
    fn test_outlier_scores_lower_than_inlier() {
        let mut forest = IsolationForest::default();
        forest.fit(&cluster()).unwrap();

        let scores = forest.score(&array![[10.45, 10.45], [100.0, -50.0]]).unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[1] < scores[0], "outlier {} should score below inlier {}", scores[1], scores[0]);
        assert!(scores.iter().all(|s| *s < 0.0 && *s > -1.0));
        assert!(scores[1] < -0.55);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let mut a = IsolationForest::default();
        let mut b = IsolationForest::default();
        a.fit(&cluster()).unwrap();
        b.fit(&cluster()).unwrap();

        let probe = array![[11.0, 9.0], [30.0, 30.0]];
        assert_eq!(a.score(&probe).unwrap(), b.score(&probe).unwrap());
        assert_eq!(a.offset, b.offset);
    }

    #[test]
    fn test_offset_flags_contamination_share() {
        let mut forest = IsolationForest::default();
        let data = cluster();
        forest.fit(&data).unwrap();

        let below = forest.score(&data).unwrap()
            .into_iter()
            .filter(|s| *s < forest.offset)
            .count();
        // 2% of 100 rows, give or take interpolation
        assert!(below <= 3, "{} rows below offset", below);
    }

    #[test]
    fn test_score_before_fit() {
        let forest = IsolationForest::default();
        assert!(matches!(forest.score(&array![[1.0, 2.0]]), Err(ScorerError::NotFitted)));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut forest = IsolationForest::default();
        forest.fit(&cluster()).unwrap();
        let result = forest.score(&array![[1.0, 2.0, 3.0]]);
        assert!(matches!(result, Err(ScorerError::ShapeMismatch { expected: 2, actual: 3 })));
    }

    #[test]
    fn test_reject_bad_training_input() {
        let mut forest = IsolationForest::default();
        assert!(matches!(
            forest.fit(&Array2::<f64>::zeros((0, 5))),
            Err(ScorerError::EmptyTrainingSet)
        ));
        assert!(matches!(
            forest.fit(&array![[1.0, f64::INFINITY], [2.0, 3.0]]),
            Err(ScorerError::NonFiniteInput { row: 0 })
        ));

        let mut bad = IsolationForest::new(IsolationForestParams {
            contamination: 0.9,
            ..Default::default()
        });
        assert!(matches!(bad.fit(&cluster()), Err(ScorerError::InvalidParams(_))));
    }

    #[test]
    fn test_constant_data_scores_uniformly() {
        let mut forest = IsolationForest::default();
        forest.fit(&Array2::from_elem((20, 3), 7.0)).unwrap();
        let scores = forest.score(&array![[7.0, 7.0, 7.0], [0.0, 0.0, 0.0]]).unwrap();
        assert_eq!(scores[0], scores[1]);
    }

    #[test]
    fn test_save_load_preserves_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iforest.json");

        let mut forest = IsolationForest::default();
        forest.fit(&cluster()).unwrap();
        forest.save(&path).unwrap();

        let loaded = IsolationForest::load(&path).unwrap();
        let probe = array![[10.2, 10.8], [0.0, 0.0]];
        assert_eq!(forest.score(&probe).unwrap(), loaded.score(&probe).unwrap());
        assert_eq!(loaded.params, forest.params);
        assert_eq!(loaded.n_features, 2);
    }

    #[test]
    fn test_save_unfitted_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let forest = IsolationForest::default();
        assert!(matches!(forest.save(&dir.path().join("x.json")), Err(ScorerError::NotFitted)));
    }
}
