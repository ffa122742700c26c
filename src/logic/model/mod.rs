//! Model Module - Unsupervised anomaly scoring
//!
//! `Scorer` is the capability; `IsolationForest` the shipped implementation;
//! `ScoringEngine` owns bootstrap and batch scoring.

pub mod artifact;
pub mod baseline;
pub mod engine;
pub mod iforest;
pub mod scorer;

pub use engine::{BootstrapOptions, ScoringEngine};
