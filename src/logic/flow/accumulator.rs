use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use crate::logic::events::PacketEvent;

/// Running totals for one source address.
///
/// Keyed by source address only. 5-tuple keying would slot in here by
/// widening the key; it is not implemented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowAccumulator {
    pub packet_count: u64,
    pub total_bytes: u64,
    /// `None` until the first packet arrives
    pub first_seen: Option<f64>,
    pub last_seen: Option<f64>,
    /// Destination ports seen. Packet events carry no port, so this stays empty
    /// and the matching feature is always 0.
    pub distinct_ports: HashSet<u16>,
}

impl FlowAccumulator {
    /// Account for one packet. Out-of-order timestamps widen the span
    /// instead of shrinking it, so `first_seen <= last_seen` always holds.
    pub fn record(&mut self, event: &PacketEvent) {
        let ts = event.timestamp;
        self.first_seen = Some(self.first_seen.map_or(ts, |first| first.min(ts)));
        self.last_seen = Some(self.last_seen.map_or(ts, |last| last.max(ts)));
        self.packet_count += 1;
        self.total_bytes += u64::from(event.length);
    }

    /// Seconds between first and last packet, 0 when fewer than two packets
    pub fn duration(&self) -> f64 {
        match (self.first_seen, self.last_seen) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Quiet for longer than `window` seconds as of `now`
    pub fn is_idle(&self, now: f64, window: f64) -> bool {
        match self.last_seen {
            Some(last) => now - last > window,
            None => false,
        }
    }
}
