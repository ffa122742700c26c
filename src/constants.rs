//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden through a `NETWATCH_*` environment variable;
//! unset or unparsable variables fall back to the default here.

use std::path::PathBuf;

/// Inactivity window (seconds) after which a quiet flow is flushed
pub const DEFAULT_WINDOW_SECS: f64 = 10.0;

/// How often the controller checks for flushable flows (seconds)
pub const DEFAULT_FLUSH_INTERVAL_SECS: f64 = 5.0;

/// Scores strictly below this raise an alert
pub const DEFAULT_ALERT_THRESHOLD: f64 = -0.70;

/// Addresses exempt from alerting
pub const DEFAULT_WHITELIST: &[&str] = &[
    "192.168.29.1",  // gateway
    "192.168.29.61", // laptop
    "10.20.160.1",   // other trusted device
];

/// Quiet period (seconds) before the "no packets" notice
pub const DEFAULT_STALE_SECS: f64 = 30.0;

/// Dequeue timeout (milliseconds)
pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 1000;

/// 0 = unbounded hand-off queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 0;

/// Rows in the synthetic "normal" training set
pub const BASELINE_SAMPLE_SIZE: usize = 200;

/// Expected outlier fraction used when fitting the model
pub const BASELINE_CONTAMINATION: f64 = 0.02;

/// Application data folder name under the platform data dir
pub const APP_DIR: &str = "netwatch";

/// Model artifact file name
pub const MODEL_FILE: &str = "iforest.json";

/// Alert database file name
pub const ALERT_DB_FILE: &str = "alerts.db";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Netwatch";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Base directory for model and alert files
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Get inactivity window from environment or use default
pub fn get_window_secs() -> f64 {
    env_parse("NETWATCH_WINDOW_SECS").unwrap_or(DEFAULT_WINDOW_SECS)
}

/// Get flush interval from environment or use default
pub fn get_flush_interval_secs() -> f64 {
    env_parse("NETWATCH_FLUSH_INTERVAL_SECS").unwrap_or(DEFAULT_FLUSH_INTERVAL_SECS)
}

/// Get alert threshold from environment or use default
pub fn get_alert_threshold() -> f64 {
    env_parse("NETWATCH_ALERT_THRESHOLD").unwrap_or(DEFAULT_ALERT_THRESHOLD)
}

/// Get whitelist from environment (comma separated) or use default
pub fn get_whitelist() -> Vec<String> {
    match std::env::var("NETWATCH_WHITELIST") {
        Ok(raw) => parse_list(&raw),
        Err(_) => DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
    }
}

/// Get liveness threshold from environment or use default
pub fn get_stale_secs() -> f64 {
    env_parse("NETWATCH_STALE_SECS").unwrap_or(DEFAULT_STALE_SECS)
}

/// Get dequeue timeout from environment or use default
pub fn get_recv_timeout_ms() -> u64 {
    env_parse("NETWATCH_RECV_TIMEOUT_MS").unwrap_or(DEFAULT_RECV_TIMEOUT_MS)
}

/// Get queue capacity from environment or use default
pub fn get_queue_capacity() -> usize {
    env_parse("NETWATCH_QUEUE_CAPACITY").unwrap_or(DEFAULT_QUEUE_CAPACITY)
}

/// Get model artifact path from environment or use default
pub fn get_model_path() -> PathBuf {
    std::env::var("NETWATCH_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join(MODEL_FILE))
}

/// Get alert database path from environment or use default
pub fn get_alert_db_path() -> PathBuf {
    std::env::var("NETWATCH_ALERT_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| get_data_dir().join(ALERT_DB_FILE))
}

/// Get block mode (`firewall`, `dry-run`, `off`) from environment
pub fn get_block_mode() -> String {
    std::env::var("NETWATCH_BLOCK_MODE")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|_| "firewall".to_string())
}

/// Get event source path; `None` means stdin
pub fn get_event_source() -> Option<PathBuf> {
    std::env::var("NETWATCH_EVENT_SOURCE")
        .ok()
        .filter(|s| !s.is_empty() && s != "-")
        .map(PathBuf::from)
}

/// Split a comma separated list, dropping blanks
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
