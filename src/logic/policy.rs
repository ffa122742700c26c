//! Alert Policy
//!
//! Threshold + whitelist. A flow alerts iff its score is strictly below the
//! threshold and its source is not whitelisted.

use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use crate::logic::config::MonitorConfig;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Score at or above threshold
    Normal,
    /// Below threshold, source whitelisted
    Suppressed,
    /// Below threshold, not whitelisted
    Alert,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Normal => "normal",
            Verdict::Suppressed => "suppressed",
            Verdict::Alert => "alert",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// POLICY
// ============================================================================

#[derive(Debug, Clone)]
pub struct AlertPolicy {
    threshold: f64,
    whitelist: HashSet<String>,
}

impl AlertPolicy {
    pub fn new(threshold: f64, whitelist: HashSet<String>) -> Self {
        Self { threshold, whitelist }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.alert_threshold, config.whitelist.clone())
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_whitelisted(&self, source: &str) -> bool {
        self.whitelist.contains(source)
    }

    pub fn evaluate(&self, source: &str, score: f64) -> Verdict {
        // NaN compares false and stays Normal
        if !(score < self.threshold) {
            return Verdict::Normal;
        }
        if self.is_whitelisted(source) {
            Verdict::Suppressed
        } else {
            Verdict::Alert
        }
    }
}

/// Reason string handed to the block executor. The score is rounded to two
/// decimals, so it shows as e.g. `anomaly score -0.90`.
pub fn block_reason(score: f64) -> String {
    format!("anomaly score {:.2}", score)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AlertPolicy {
        let whitelist = ["192.168.29.1", "10.20.160.1"].iter().map(|s| s.to_string()).collect();
        AlertPolicy::new(-0.70, whitelist)
    }

    #[test]
    fn test_alert_below_threshold() {
        assert_eq!(policy().evaluate("10.0.0.5", -0.85), Verdict::Alert);
    }

    #[test]
    fn test_threshold_is_strict() {
        let p = policy();
        assert_eq!(p.evaluate("10.0.0.5", -0.70), Verdict::Normal);
        assert_eq!(p.evaluate("10.0.0.5", -0.45), Verdict::Normal);
        assert_eq!(p.evaluate("10.0.0.5", -0.7000001), Verdict::Alert);
    }

    #[test]
    fn test_whitelisted_never_alerts() {
        let p = policy();
        for score in [-1.0, -0.99, -0.71, -0.5, 0.0] {
            assert_ne!(p.evaluate("192.168.29.1", score), Verdict::Alert);
        }
        assert_eq!(p.evaluate("10.20.160.1", -0.95), Verdict::Suppressed);
    }

    #[test]
    fn test_nan_score_is_normal() {
        assert_eq!(policy().evaluate("10.0.0.5", f64::NAN), Verdict::Normal);
    }

    #[test]
    fn test_from_config_uses_defaults() {
        let p = AlertPolicy::from_config(&MonitorConfig::default());
        assert_eq!(p.threshold(), -0.70);
        assert!(p.is_whitelisted("192.168.29.61"));
    }

    #[test]
    fn test_block_reason_format() {
        assert_eq!(block_reason(-0.8123), "anomaly score -0.81");
        // Rounded, not the raw float
        assert_eq!(block_reason(-0.7), "anomaly score -0.70");
    }
}
