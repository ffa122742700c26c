//! Feature extraction tests against hand-built accumulators

use crate::logic::events::PacketEvent;
use crate::logic::flow::FlowAccumulator;
use super::vector::{FeatureVector, MIN_DURATION_SECS};

fn flow_from(events: &[(f64, u32)]) -> FlowAccumulator {
    let mut flow = FlowAccumulator::default();
    for &(ts, len) in events {
        flow.record(&PacketEvent::new(ts, "10.0.0.5", "10.0.0.1", 6, len));
    }
    flow
}

#[test]
fn test_empty_flow_does_not_divide_by_zero() {
    let fv = FeatureVector::from_flow(&FlowAccumulator::default());
    assert_eq!(fv.values, [0.0, 0.0, 0.0, 0.0, 0.0]);
    assert!(fv.values.iter().all(|v| v.is_finite()));
}

#[test]
fn test_single_packet_uses_duration_floor() {
    let fv = FeatureVector::from_flow(&flow_from(&[(100.0, 60)]));
    assert_eq!(fv.packet_count(), 1.0);
    assert_eq!(fv.total_bytes(), 60.0);
    assert!((fv.packet_rate() - 1.0 / MIN_DURATION_SECS).abs() < 1e-6);
    assert_eq!(fv.avg_packet_size(), 60.0);
}

#[test]
fn test_rate_and_average() {
    // 4 packets over 2 seconds, 400 bytes
    let fv = FeatureVector::from_flow(&flow_from(&[(10.0, 50), (10.5, 150), (11.0, 100), (12.0, 100)]));
    assert_eq!(fv.packet_count(), 4.0);
    assert_eq!(fv.total_bytes(), 400.0);
    assert!((fv.packet_rate() - 2.0).abs() < 1e-9);
    assert!((fv.avg_packet_size() - 100.0).abs() < 1e-9);
}

#[test]
fn test_port_feature_stays_zero() {
    let fv = FeatureVector::from_flow(&flow_from(&[(1.0, 10), (2.0, 10)]));
    assert_eq!(fv.distinct_port_count(), 0.0);
}

#[test]
fn test_extracted_vector_carries_current_layout() {
    let fv = FeatureVector::from_flow(&flow_from(&[(1.0, 10)]));
    assert!(fv.validate().is_ok());

    let entry = fv.to_log_entry();
    assert_eq!(entry["packet_count"], 1.0);
    assert_eq!(entry["total_bytes"], 10.0);
}
