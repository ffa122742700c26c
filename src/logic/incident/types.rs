use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raised alert, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub source: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn summary(&self) -> String {
        format!(
            "#{} {} score={:.3} at {}",
            self.id,
            self.source,
            self.score,
            self.timestamp.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
