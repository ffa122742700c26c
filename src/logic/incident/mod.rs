//! Incident Module - Persisted alerts
//!
//! Append-only alert log. The monitor only ever inserts; `recent` is the
//! read path for dashboards and shutdown summaries.

pub mod store;
pub mod types;

pub use store::{AlertStore, SqliteAlertStore};
