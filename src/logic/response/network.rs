//! Network Block Executor
//!
//! Windows: `New-NetFirewallRule` through PowerShell.
//! Elsewhere: `iptables -I INPUT -s <ip> -j DROP`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::process::Command;
use std::time::Instant;
use chrono::Utc;
use parking_lot::RwLock;

use super::types::{ActionError, ActionResult, ActionStatus, ResponseAction};

// ============================================================================
// CONSTANTS
// ============================================================================

const RULE_PREFIX: &str = "Block_";

// ============================================================================
// TRAIT
// ============================================================================

/// Something that can be asked to block an address
pub trait BlockExecutor: Send {
    fn name(&self) -> &'static str;

    fn block(&self, address: &str, reason: &str) -> Result<ActionResult, ActionError>;

    /// Addresses this executor has blocked, with unix time of the block
    fn blocked(&self) -> Vec<(String, i64)> {
        Vec::new()
    }
}

// ============================================================================
// COMMAND BUILDING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl FirewallCommand {
    /// Build the block command for `ip`. Quotes are stripped from `reason`.
    pub fn block(platform: Platform, ip: IpAddr, reason: &str) -> Self {
        let reason: String = reason.chars().filter(|c| *c != '\'' && *c != '"').collect();

        match platform {
            Platform::Windows => Self {
                program: "powershell".to_string(),
                args: vec![
                    "-NoProfile".to_string(),
                    "-Command".to_string(),
                    format!(
                        "New-NetFirewallRule -DisplayName '{}{}' -Direction Inbound -RemoteAddress {} -Action Block -Description '{}'",
                        RULE_PREFIX, ip, ip, reason
                    ),
                ],
            },
            Platform::Unix => Self {
                program: "iptables".to_string(),
                args: ["-I", "INPUT", "-s", &ip.to_string(), "-j", "DROP"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        }
    }

    pub fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

fn run_command(cmd: &FirewallCommand) -> Result<(), ActionError> {
    let output = Command::new(&cmd.program)
        .args(&cmd.args)
        .output()
        .map_err(|e| ActionError::SpawnFailed {
            command: cmd.program.clone(),
            message: e.to_string(),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(ActionError::CommandFailed {
            command: cmd.program.clone(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn parse_address(address: &str) -> Result<IpAddr, ActionError> {
    address.trim().parse::<IpAddr>().map_err(|_| ActionError::InvalidAddress {
        address: address.to_string(),
    })
}

// ============================================================================
// FIREWALL EXECUTOR
// ============================================================================

type Runner = Box<dyn Fn(&FirewallCommand) -> Result<(), ActionError> + Send + Sync>;

pub struct FirewallExecutor {
    platform: Platform,
    runner: Runner,
    blocked: RwLock<HashMap<IpAddr, i64>>,
}

impl FirewallExecutor {
    pub fn new() -> Self {
        Self::with_runner(Platform::current(), Box::new(run_command))
    }

    /// Custom command runner (for testing)
    pub fn with_runner(platform: Platform, runner: Runner) -> Self {
        Self {
            platform,
            runner,
            blocked: RwLock::new(HashMap::new()),
        }
    }

    fn is_blocked(&self, ip: &IpAddr) -> bool {
        self.blocked.read().contains_key(ip)
    }
}

impl Default for FirewallExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockExecutor for FirewallExecutor {
    fn name(&self) -> &'static str {
        "firewall"
    }

    fn block(&self, address: &str, reason: &str) -> Result<ActionResult, ActionError> {
        let start = Instant::now();
        let ip = parse_address(address)?;
        let action = ResponseAction::BlockAddress {
            address: ip.to_string(),
            reason: reason.to_string(),
        };

        if self.is_blocked(&ip) {
            log::debug!("{} already blocked, skipping rule", ip);
            return Ok(ActionResult {
                action,
                status: ActionStatus::AlreadyBlocked,
                message: format!("{} already blocked", ip),
                timestamp: Utc::now().timestamp(),
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        let cmd = FirewallCommand::block(self.platform, ip, reason);
        (self.runner)(&cmd)?;

        self.blocked.write().insert(ip, Utc::now().timestamp());
        log::warn!("Blocked {} ({})", ip, reason);

        Ok(ActionResult {
            action,
            status: ActionStatus::Success,
            message: format!("Ran: {}", cmd.display()),
            timestamp: Utc::now().timestamp(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn blocked(&self) -> Vec<(String, i64)> {
        let mut list: Vec<(String, i64)> = self.blocked.read()
            .iter()
            .map(|(ip, at)| (ip.to_string(), *at))
            .collect();
        list.sort();
        list
    }
}

// ============================================================================
// DRY RUN
// ============================================================================

/// Logs what would be blocked
#[derive(Debug, Default)]
pub struct DryRunExecutor;

impl BlockExecutor for DryRunExecutor {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn block(&self, address: &str, reason: &str) -> Result<ActionResult, ActionError> {
        let ip = parse_address(address)?;
        let cmd = FirewallCommand::block(Platform::current(), ip, reason);
        log::warn!("[dry-run] would run: {}", cmd.display());

        Ok(ActionResult {
            action: ResponseAction::BlockAddress {
                address: ip.to_string(),
                reason: reason.to_string(),
            },
            status: ActionStatus::DryRun,
            message: cmd.display(),
            timestamp: Utc::now().timestamp(),
            duration_ms: 0,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(platform: Platform) -> (FirewallExecutor, Arc<Mutex<Vec<FirewallCommand>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let exec = FirewallExecutor::with_runner(
            platform,
            Box::new(move |cmd: &FirewallCommand| {
                sink.lock().unwrap().push(cmd.clone());
                Ok(())
            }),
        );
        (exec, seen)
    }

    #[test]
    fn test_windows_command_shape() {
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        let cmd = FirewallCommand::block(Platform::Windows, ip, "anomaly score -0.81");
        assert_eq!(cmd.program, "powershell");
        assert_eq!(
            cmd.args[2],
            "New-NetFirewallRule -DisplayName 'Block_10.0.0.5' -Direction Inbound \
             -RemoteAddress 10.0.0.5 -Action Block -Description 'anomaly score -0.81'"
        );
    }

    #[test]
    fn test_unix_command_shape() {
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        let cmd = FirewallCommand::block(Platform::Unix, ip, "ignored");
        assert_eq!(cmd.display(), "iptables -I INPUT -s 10.0.0.5 -j DROP");
    }

    #[test]
    fn test_quotes_stripped_from_reason() {
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        let cmd = FirewallCommand::block(Platform::Windows, ip, "x'; Remove-Item C:\\ -Recurse; '\"");
        assert!(cmd.args[2].ends_with("-Description 'x; Remove-Item C:\\ -Recurse; '"));
    }

    #[test]
    fn test_rejects_non_ip_address() {
        let (exec, seen) = recording(Platform::Unix);
        for bad in ["", "not-an-ip", "10.0.0.5; rm -rf /", "10.0.0.256"] {
            assert!(matches!(exec.block(bad, "r"), Err(ActionError::InvalidAddress { .. })));
        }
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_block_tracks_and_dedups() {
        let (exec, seen) = recording(Platform::Unix);

        let first = exec.block("10.0.0.5", "anomaly score -0.90").unwrap();
        assert_eq!(first.status, ActionStatus::Success);
        assert!(exec.is_blocked(&"10.0.0.5".parse().unwrap()));

        let second = exec.block("10.0.0.5", "anomaly score -0.91").unwrap();
        assert_eq!(second.status, ActionStatus::AlreadyBlocked);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(exec.blocked().len(), 1);
    }

    #[test]
    fn test_failed_command_not_tracked() {
        let exec = FirewallExecutor::with_runner(
            Platform::Unix,
            Box::new(|cmd: &FirewallCommand| {
                Err(ActionError::CommandFailed {
                    command: cmd.program.clone(),
                    exit_code: 4,
                    stderr: "Permission denied".to_string(),
                })
            }),
        );

        let err = exec.block("10.0.0.5", "r").unwrap_err();
        assert!(matches!(err, ActionError::CommandFailed { exit_code: 4, .. }));
        assert!(!exec.is_blocked(&"10.0.0.5".parse().unwrap()));
    }

    #[test]
    fn test_dry_run_never_executes() {
        let result = DryRunExecutor.block("2001:db8::1", "anomaly score -0.75").unwrap();
        assert_eq!(result.status, ActionStatus::DryRun);
        assert!(DryRunExecutor.blocked().is_empty());
    }
}
