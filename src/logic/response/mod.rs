//! Response Module - Block actions for alerting sources
//!
//! # Components
//! - `network.rs`: host firewall executor (PowerShell / iptables) and dry-run
//! - `types.rs`: action results and errors

pub mod network;
pub mod types;

pub use network::{BlockExecutor, DryRunExecutor, FirewallExecutor};
