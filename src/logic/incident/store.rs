//! Alert Store - SQLite persistence
//!
//! Schema matches the dashboard's reader:
//! `alerts(id INTEGER PRIMARY KEY AUTOINCREMENT, source TEXT, score REAL,
//! timestamp DATETIME DEFAULT CURRENT_TIMESTAMP)`.
//!
//! The connection is opened on first use. A failed statement drops the
//! connection so the next alert reconnects from scratch.

use std::path::{Path, PathBuf};
use chrono::{NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use super::types::Alert;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT,
        score REAL,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_alerts_source ON alerts(source);
"#;

/// `CURRENT_TIMESTAMP` text form, always UTC
const SQLITE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// TRAIT
// ============================================================================

/// Append-only alert sink
pub trait AlertStore: Send {
    /// Insert one alert, returning its id
    fn append(&self, source: &str, score: f64) -> Result<i64, StoreError>;

    /// Newest first
    fn recent(&self, limit: usize) -> Result<Vec<Alert>, StoreError>;

    fn count(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SQLITE
// ============================================================================

pub struct SqliteAlertStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteAlertStore {
    /// Lazy store at `path`; nothing touches disk until the first call
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: Mutex::new(None),
        }
    }

    /// Open the connection now instead of on the first alert
    pub fn ensure_ready(&self) -> Result<(), StoreError> {
        self.with_conn(|_| Ok(()))
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("Alert store connected: {:?}", self.path);
        Ok(conn)
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let mut guard = self.conn.lock();
        let conn = match guard.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };

        match f(&conn) {
            Ok(value) => {
                *guard = Some(conn);
                Ok(value)
            }
            Err(e) => {
                log::debug!("Dropping alert store connection after error: {}", e);
                Err(e.into())
            }
        }
    }
}

impl AlertStore for SqliteAlertStore {
    fn append(&self, source: &str, score: f64) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO alerts (source, score) VALUES (?1, ?2)",
                params![source, score],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn recent(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, source, score, timestamp FROM alerts ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                let raw: String = row.get(3)?;
                let naive = NaiveDateTime::parse_from_str(&raw, SQLITE_TIME_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
                })?;
                Ok(Alert {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    score: row.get(2)?,
                    timestamp: Utc.from_utc_datetime(&naive),
                })
            })?;
            let alerts = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(alerts)
        })
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        })
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "Alert store error: {}", e),
            StoreError::Io(e) => write!(f, "Alert store IO error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

// ============================================================================
// TESTS
// ============================================================================
