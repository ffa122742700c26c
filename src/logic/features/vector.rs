//! Feature Vector - Scorer input for one flushed flow
//!
//! `[packet_count, total_bytes, packet_rate, avg_packet_size, distinct_port_count]`
//! with the layout version/hash from `layout.rs` attached.

use serde::{Deserialize, Serialize};
use super::layout::{
    FEATURE_COUNT, FEATURE_VERSION, FEATURE_LAYOUT,
    layout_hash, validate_layout, LayoutMismatchError,
};
use crate::logic::flow::FlowAccumulator;

/// Floor for flow duration (seconds) in the rate denominator
pub const MIN_DURATION_SECS: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create from raw values with current version
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Derive features from a flow accumulator.
    ///
    /// Pure and total: an empty accumulator yields all zeros rather than
    /// dividing by zero.
    pub fn from_flow(flow: &FlowAccumulator) -> Self {
        let count = flow.packet_count as f64;
        let bytes = flow.total_bytes as f64;
        let duration = flow.duration().max(MIN_DURATION_SECS);

        Self::from_values([
            count,
            bytes,
            count / duration,
            bytes / (flow.packet_count.max(1) as f64),
            flow.distinct_ports.len() as f64,
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Built against the current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    /// Named values for debug logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        let named: serde_json::Map<String, serde_json::Value> = FEATURE_LAYOUT.iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
            .collect();
        serde_json::Value::Object(named)
    }
}

#[cfg(test)]
impl FeatureVector {
    pub fn packet_count(&self) -> f64 { self.values[0] }
    pub fn total_bytes(&self) -> f64 { self.values[1] }
    pub fn packet_rate(&self) -> f64 { self.values[2] }
    pub fn avg_packet_size(&self) -> f64 { self.values[3] }
    pub fn distinct_port_count(&self) -> f64 { self.values[4] }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}
