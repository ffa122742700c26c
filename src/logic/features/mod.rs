//! Features Module - Feature Extraction Engine
//!
//! Turns an evicted flow accumulator into the fixed-size vector the scorer
//! consumes. Layout and versioning live in `layout.rs`.

pub mod layout;
pub mod vector;

#[cfg(test)]
mod tests;

pub use layout::FEATURE_COUNT;
pub use vector::FeatureVector;
