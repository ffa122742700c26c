//! Response Types

use serde::{Deserialize, Serialize};

// ============================================================================
// RESPONSE ACTION TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseAction {
    /// Drop inbound traffic from an address
    BlockAddress { address: String, reason: String },
}

/// Result of an action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: ResponseAction,
    pub status: ActionStatus,
    pub message: String,
    pub timestamp: i64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Success,
    /// Address already blocked by this executor
    AlreadyBlocked,
    /// Logged only
    DryRun,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Success => "success",
            ActionStatus::AlreadyBlocked => "already_blocked",
            ActionStatus::DryRun => "dry_run",
        }
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionError {
    /// Not an IPv4/IPv6 literal
    InvalidAddress { address: String },
    /// Command ran and exited non-zero
    CommandFailed { command: String, exit_code: i32, stderr: String },
    /// Command could not be started
    SpawnFailed { command: String, message: String },
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::InvalidAddress { address } => {
                write!(f, "Invalid address: '{}'", address)
            }
            ActionError::CommandFailed { command, exit_code, stderr } => {
                write!(f, "Command '{}' failed ({}): {}", command, exit_code, stderr)
            }
            ActionError::SpawnFailed { command, message } => {
                write!(f, "Could not run '{}': {}", command, message)
            }
        }
    }
}

impl std::error::Error for ActionError {}
