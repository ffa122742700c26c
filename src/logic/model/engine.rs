//! Scoring Engine - bootstrap + batch scoring
//!
//! Bootstrap runs once per process: load the persisted model, or synthesize
//! a baseline, fit and persist. After that the scorer is read-only.

use std::path::PathBuf;
use std::time::Instant;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{get_model_path, BASELINE_CONTAMINATION, BASELINE_SAMPLE_SIZE};
use crate::logic::features::{FeatureVector, FEATURE_COUNT};
use super::baseline;
use super::iforest::{IsolationForest, IsolationForestParams};
use super::scorer::{Scorer, ScorerError};

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub model_path: PathBuf,
    /// Rows in the synthetic baseline
    pub sample_size: usize,
    pub contamination: f64,
    /// Baseline RNG seed; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            model_path: get_model_path(),
            sample_size: BASELINE_SAMPLE_SIZE,
            contamination: BASELINE_CONTAMINATION,
            seed: None,
        }
    }
}

impl BootstrapOptions {
    pub fn at(model_path: PathBuf) -> Self {
        Self { model_path, ..Self::default() }
    }
}

/// How the engine got its model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Loaded,
    Trained { persisted: bool },
    /// Scorer handed in directly
    #[cfg(test)]
    Injected,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct ScoringEngine {
    scorer: Box<dyn Scorer>,
    outcome: BootstrapOutcome,
}

impl ScoringEngine {
    /// Wrap an already-usable scorer
    #[cfg(test)]
    pub fn new(scorer: Box<dyn Scorer>) -> Self {
        Self { scorer, outcome: BootstrapOutcome::Injected }
    }

    /// Load-or-train with the isolation forest
    pub fn bootstrap(opts: &BootstrapOptions) -> Result<Self, ScorerError> {
        let params = IsolationForestParams {
            contamination: opts.contamination,
            ..IsolationForestParams::default()
        };
        Self::bootstrap_with(opts, move || IsolationForest::new(params))
    }

    /// Load-or-train with any concrete scorer; `make` builds an unfitted one
    pub fn bootstrap_with<S, F>(opts: &BootstrapOptions, make: F) -> Result<Self, ScorerError>
    where
        S: Scorer + 'static,
        F: FnOnce() -> S,
    {
        let path = &opts.model_path;

        if path.exists() {
            match S::load(path) {
                Ok(scorer) => {
                    log::info!("Loaded {} model from {:?}", scorer.name(), path);
                    return Ok(Self { scorer: Box::new(scorer), outcome: BootstrapOutcome::Loaded });
                }
                Err(e) => {
                    log::warn!("Model at {:?} unreadable ({}), retraining", path, e);
                }
            }
        } else {
            log::info!("No model at {:?}, training on synthetic baseline", path);
        }

        let mut rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let samples = baseline::synthesize(&mut rng, opts.sample_size)?;

        let start = Instant::now();
        let mut scorer = make();
        scorer.fit(&samples)?;
        log::info!(
            "Trained {} on {} baseline rows in {} ms",
            scorer.name(),
            samples.nrows(),
            start.elapsed().as_millis()
        );

        let persisted = match scorer.save(path) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist model to {:?}: {}", path, e);
                false
            }
        };

        Ok(Self {
            scorer: Box::new(scorer),
            outcome: BootstrapOutcome::Trained { persisted },
        })
    }

    pub fn outcome(&self) -> BootstrapOutcome {
        self.outcome
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// One score per vector, same order. Empty in, empty out.
    pub fn score(&self, batch: &[FeatureVector]) -> Result<Vec<f64>, ScorerError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        for vector in batch {
            vector.validate()?;
        }

        let data: Vec<f64> = batch.iter().flat_map(|v| v.as_slice().iter().copied()).collect();
        let samples = Array2::from_shape_vec((batch.len(), FEATURE_COUNT), data)
            .map_err(|e| ScorerError::InvalidParams(e.to_string()))?;

        let scores = self.scorer.score(&samples)?;
        if scores.len() != batch.len() {
            return Err(ScorerError::ShapeMismatch {
                expected: batch.len(),
                actual: scores.len(),
            });
        }
        Ok(scores)
    }
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("scorer", &self.scorer.name())
            .field("outcome", &self.outcome)
            .finish()
    }
}
