//! Logic Module - Monitor engines
//!
//! ## Pipeline
//! - `collector` - replay events into the hand-off channel
//! - `flow/` - per-source aggregation with inactivity eviction
//! - `features/` - flow -> feature vector
//! - `model/` - anomaly scorer, bootstrap
//! - `policy` - threshold + whitelist
//! - `incident/` - alert persistence
//! - `response/` - block actions
//! - `analysis_loop` - the controller tying it together

pub mod config;
pub mod events;
pub mod collector;

pub mod flow;
pub mod features;
pub mod model;

pub mod policy;
pub mod incident;
pub mod response;

pub mod analysis_loop;
