//! Monitor Configuration
//!
//! One immutable snapshot built at startup from `crate::constants`.
//! Nothing here changes after the controller starts.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::constants;

/// What to do with an anomalous source once the alert is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockMode {
    /// Install a firewall rule
    Firewall,
    /// Log the rule that would be installed
    DryRun,
    /// Alerts only
    Off,
}

impl BlockMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "firewall" | "block" | "on" => Some(BlockMode::Firewall),
            "dry-run" | "dryrun" | "dry_run" => Some(BlockMode::DryRun),
            "off" | "none" | "disabled" => Some(BlockMode::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockMode::Firewall => "firewall",
            BlockMode::DryRun => "dry-run",
            BlockMode::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Inactivity window W (seconds)
    pub window_secs: f64,
    /// Flush-check cadence F (seconds)
    pub flush_interval_secs: f64,
    pub alert_threshold: f64,
    pub whitelist: HashSet<String>,
    /// Liveness notice after this many quiet seconds
    pub stale_secs: f64,
    pub recv_timeout_ms: u64,
    /// 0 = unbounded
    pub queue_capacity: usize,
    pub model_path: PathBuf,
    pub alert_db_path: PathBuf,
    pub block_mode: BlockMode,
    /// `None` = stdin
    pub event_source: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let data_dir = constants::get_data_dir();
        Self {
            window_secs: constants::DEFAULT_WINDOW_SECS,
            flush_interval_secs: constants::DEFAULT_FLUSH_INTERVAL_SECS,
            alert_threshold: constants::DEFAULT_ALERT_THRESHOLD,
            whitelist: constants::DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
            stale_secs: constants::DEFAULT_STALE_SECS,
            recv_timeout_ms: constants::DEFAULT_RECV_TIMEOUT_MS,
            queue_capacity: constants::DEFAULT_QUEUE_CAPACITY,
            model_path: data_dir.join(constants::MODEL_FILE),
            alert_db_path: data_dir.join(constants::ALERT_DB_FILE),
            block_mode: BlockMode::Firewall,
            event_source: None,
        }
    }
}

impl MonitorConfig {
    /// Build from `NETWATCH_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_mode = constants::get_block_mode();
        let block_mode = BlockMode::from_str(&raw_mode)
            .ok_or_else(|| ConfigError::InvalidBlockMode(raw_mode.clone()))?;

        let config = Self {
            window_secs: constants::get_window_secs(),
            flush_interval_secs: constants::get_flush_interval_secs(),
            alert_threshold: constants::get_alert_threshold(),
            whitelist: constants::get_whitelist().into_iter().collect(),
            stale_secs: constants::get_stale_secs(),
            recv_timeout_ms: constants::get_recv_timeout_ms(),
            queue_capacity: constants::get_queue_capacity(),
            model_path: constants::get_model_path(),
            alert_db_path: constants::get_alert_db_path(),
            block_mode,
            event_source: constants::get_event_source(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("window_secs", self.window_secs),
            ("flush_interval_secs", self.flush_interval_secs),
            ("stale_secs", self.stale_secs),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: name,
                    reason: format!("must be a positive number of seconds, got {}", value),
                });
            }
        }

        if !self.alert_threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "alert_threshold",
                reason: format!("must be finite, got {}", self.alert_threshold),
            });
        }

        if self.recv_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "recv_timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
    InvalidBlockMode(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid config value for {}: {}", field, reason)
            }
            ConfigError::InvalidBlockMode(mode) => {
                write!(f, "Unknown block mode '{}' (expected firewall, dry-run or off)", mode)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_secs, 10.0);
        assert_eq!(config.flush_interval_secs, 5.0);
        assert_eq!(config.alert_threshold, -0.70);
        assert!(config.whitelist.contains("192.168.29.1"));
        assert!(!config.whitelist.contains("10.0.0.5"));
    }

    #[test]
    fn test_reject_non_positive_window() {
        let config = MonitorConfig { window_secs: 0.0, ..Default::default() };
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "window_secs"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_nan_threshold() {
        let config = MonitorConfig { alert_threshold: f64::NAN, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_block_mode_parsing() {
        assert_eq!(BlockMode::from_str("Dry-Run"), Some(BlockMode::DryRun));
        assert_eq!(BlockMode::from_str("off"), Some(BlockMode::Off));
        assert_eq!(BlockMode::from_str("firewall"), Some(BlockMode::Firewall));
        assert_eq!(BlockMode::from_str("nuke"), None);
    }
}
