//! Packet Events - Inbound observation records
//!
//! One record per observed packet: `(timestamp, source, dest, protocol, length)`.
//! Deserialises from either the tuple form `[ts, src, dst, proto, len]`
//! or an object with the same field names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketEvent {
    /// Capture time, seconds since the Unix epoch
    pub timestamp: f64,
    pub source: String,
    pub dest: String,
    /// IP protocol number
    pub protocol: u8,
    /// Bytes on the wire
    pub length: u32,
}

impl PacketEvent {
    #[cfg(test)]
    pub fn new(timestamp: f64, source: &str, dest: &str, protocol: u8, length: u32) -> Self {
        Self {
            timestamp,
            source: source.to_string(),
            dest: dest.to_string(),
            protocol,
            length,
        }
    }

    /// Parse one line of a capture feed
    pub fn from_json_line(line: &str) -> Result<Self, EventError> {
        let event: PacketEvent = serde_json::from_str(line.trim())?;
        event.validate()?;
        Ok(event)
    }

    /// Reject events the aggregator cannot account for
    pub fn validate(&self) -> Result<(), EventError> {
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(EventError::InvalidTimestamp(self.timestamp));
        }
        if self.source.trim().is_empty() {
            return Err(EventError::MissingSource);
        }
        Ok(())
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum EventError {
    Parse(serde_json::Error),
    InvalidTimestamp(f64),
    MissingSource,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventError::Parse(e) => write!(f, "Malformed event: {}", e),
            EventError::InvalidTimestamp(ts) => write!(f, "Invalid event timestamp: {}", ts),
            EventError::MissingSource => write!(f, "Event has no source address"),
        }
    }
}

impl std::error::Error for EventError {}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Parse(err)
    }
}
