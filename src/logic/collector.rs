//! Collector - Replay packet events into the hand-off channel
//!
//! Reads one JSON event per line from a file or stdin on its own thread.
//! Live capture plugs in by feeding the same channel.

use std::io::BufRead;
use std::thread::{self, JoinHandle};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use super::events::PacketEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorStats {
    pub lines_read: u64,
    pub events_sent: u64,
    pub lines_rejected: u64,
}

/// Forward every parsable line to `tx` until the reader is exhausted or the
/// receiver hangs up.
pub fn pump<R: BufRead>(reader: R, tx: &Sender<PacketEvent>) -> CollectorStats {
    let mut stats = CollectorStats::default();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("Event source read failed: {}", e);
                break;
            }
        };
        stats.lines_read += 1;

        if line.trim().is_empty() {
            continue;
        }

        match PacketEvent::from_json_line(&line) {
            Ok(event) => {
                if tx.send(event).is_err() {
                    log::debug!("Event channel closed, collector stopping");
                    break;
                }
                stats.events_sent += 1;
            }
            Err(e) => {
                stats.lines_rejected += 1;
                log::warn!("Skipping line {}: {}", stats.lines_read, e);
            }
        }
    }

    stats
}

/// Run [`pump`] on a named thread. `tx` is dropped when the reader ends.
pub fn spawn_reader<R>(reader: R, tx: Sender<PacketEvent>) -> std::io::Result<JoinHandle<CollectorStats>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("netwatch-collector".to_string())
        .spawn(move || {
            let stats = pump(reader, &tx);
            log::info!(
                "Event source exhausted: {} lines, {} events, {} rejected",
                stats.lines_read, stats.events_sent, stats.lines_rejected
            );
            stats
        })
}
