//! Analysis Loop - Single-consumer controller
//!
//! Pulls packet events off the hand-off channel with a short timeout, folds
//! them into the aggregator, and every flush interval scores the flows that
//! went quiet. Alerts go to the store, then to the block executor; both are
//! best-effort.

use std::sync::atomic::{AtomicBool, Ordering};
use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};

use crate::logic::config::MonitorConfig;
use crate::logic::events::PacketEvent;
use crate::logic::features::FeatureVector;
use crate::logic::flow::{FlowAggregator, FlushedFlow};
use crate::logic::incident::AlertStore;
use crate::logic::model::ScoringEngine;
use crate::logic::policy::{block_reason, AlertPolicy, Verdict};
use crate::logic::response::BlockExecutor;

// ============================================================================
// CLOCK
// ============================================================================

/// Seconds since the Unix epoch, same base as packet timestamps
pub trait Clock: Send {
    fn now(&self) -> f64;

    /// Called with the timestamp of every accepted event
    fn observe(&mut self, _timestamp: f64) {}
}

/// Wall clock, for live feeds
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Event time, for recorded feeds: reads as the newest timestamp ingested so
/// far and never moves backwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventClock {
    latest: f64,
}

impl EventClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for EventClock {
    fn now(&self) -> f64 {
        self.latest
    }

    fn observe(&mut self, timestamp: f64) {
        if timestamp > self.latest {
            self.latest = timestamp;
        }
    }
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStats {
    pub events_ingested: u64,
    pub events_rejected: u64,
    pub heartbeats: u64,
    pub flush_cycles: u64,
    pub flows_scored: u64,
    pub alerts_raised: u64,
    pub alerts_suppressed: u64,
    pub scoring_failures: u64,
    pub persistence_failures: u64,
    pub action_failures: u64,
    pub stale_notices: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Shutdown flag raised
    Interrupted,
    /// Every sender dropped
    SourceExhausted,
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct AnalysisLoop {
    config: MonitorConfig,
    aggregator: FlowAggregator,
    engine: ScoringEngine,
    policy: AlertPolicy,
    store: Box<dyn AlertStore>,
    executor: Option<Box<dyn BlockExecutor>>,
    clock: Box<dyn Clock>,
    last_flush: f64,
    last_event: f64,
    stats: LoopStats,
}

impl AnalysisLoop {
    pub fn new(
        config: MonitorConfig,
        engine: ScoringEngine,
        store: Box<dyn AlertStore>,
        executor: Option<Box<dyn BlockExecutor>>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            aggregator: FlowAggregator::new(config.window_secs),
            policy: AlertPolicy::from_config(&config),
            config,
            engine,
            store,
            executor,
            clock,
            last_flush: now,
            last_event: now,
            stats: LoopStats::default(),
        }
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn aggregator(&self) -> &FlowAggregator {
        &self.aggregator
    }

    pub fn store(&self) -> &dyn AlertStore {
        self.store.as_ref()
    }

    pub fn executor(&self) -> Option<&dyn BlockExecutor> {
        self.executor.as_deref()
    }

    /// One iteration: ingest (or heartbeat), flush check, liveness check
    pub fn step(&mut self, event: Option<PacketEvent>) {
        let accepted = match event {
            Some(event) => self.ingest(event),
            None => {
                self.stats.heartbeats += 1;
                log::trace!("No event within {} ms", self.config.recv_timeout_ms);
                false
            }
        };

        let now = self.clock.now();
        if accepted {
            self.last_event = now;
        }

        if now - self.last_flush > self.config.flush_interval_secs {
            self.flush_cycle(now);
            self.last_flush = now;
        }

        if now - self.last_event > self.config.stale_secs {
            self.stats.stale_notices += 1;
            log::info!(
                "No packets for {:.0}s, {} flows live",
                now - self.last_event,
                self.aggregator.len()
            );
            self.last_event = now;
        }
    }

    fn ingest(&mut self, event: PacketEvent) -> bool {
        if let Err(e) = event.validate() {
            self.stats.events_rejected += 1;
            log::warn!("Rejected event from '{}': {}", event.source, e);
            return false;
        }
        self.clock.observe(event.timestamp);
        self.aggregator.ingest(&event);
        self.stats.events_ingested += 1;
        true
    }

    /// Flush quiet flows as of `now` and act on their scores
    pub fn flush_cycle(&mut self, now: f64) {
        let flushed = self.aggregator.flush(now);
        self.stats.flush_cycles += 1;
        log::debug!("Flush at {:.3}: {} flows ready, {} live", now, flushed.len(), self.aggregator.len());
        self.score_and_dispatch(flushed);
    }

    fn score_and_dispatch(&mut self, flushed: Vec<FlushedFlow>) {
        if flushed.is_empty() {
            return;
        }

        let (keys, vectors): (Vec<String>, Vec<FeatureVector>) =
            flushed.into_iter().map(|f| (f.key, f.features)).unzip();

        let scores = match self.engine.score(&vectors) {
            Ok(scores) => scores,
            Err(e) => {
                self.stats.scoring_failures += 1;
                log::error!("Scoring {} flows failed: {}", vectors.len(), e);
                return;
            }
        };
        self.stats.flows_scored += scores.len() as u64;

        for ((key, vector), score) in keys.iter().zip(&vectors).zip(scores) {
            log::debug!("{} score={:.4} {}", key, score, vector.to_log_entry());

            match self.policy.evaluate(key, score) {
                Verdict::Normal => {}
                Verdict::Suppressed => {
                    self.stats.alerts_suppressed += 1;
                    log::info!("Whitelisted {} scored {:.3}, no alert", key, score);
                }
                Verdict::Alert => self.dispatch(key, score),
            }
        }
    }

    /// Persist, then block. Neither failure stops the other.
    fn dispatch(&mut self, source: &str, score: f64) {
        self.stats.alerts_raised += 1;
        log::warn!("ALERT: anomalous traffic from {} (score {:.3})", source, score);

        if let Err(e) = self.store.append(source, score) {
            self.stats.persistence_failures += 1;
            log::error!("Failed to persist alert for {}: {}", source, e);
        }

        if let Some(executor) = &self.executor {
            match executor.block(source, &block_reason(score)) {
                Ok(result) => log::info!("{}: {} ({})", executor.name(), result.message, result.status.as_str()),
                Err(e) => {
                    self.stats.action_failures += 1;
                    log::error!("Block action for {} failed: {}", source, e);
                }
            }
        }
    }

    /// Drive [`step`](Self::step) until `shutdown` is raised or every sender
    /// is gone.
    ///
    /// On shutdown, queued events are drained into the aggregator and the
    /// loop exits without scoring. On disconnect, every remaining flow is
    /// scored once before exiting.
    pub fn run(&mut self, rx: &Receiver<PacketEvent>, shutdown: &AtomicBool) -> ExitReason {
        let timeout = self.config.recv_timeout();
        log::info!(
            "Analysis loop started (W={}s, F={}s, threshold={})",
            self.config.window_secs, self.config.flush_interval_secs, self.policy.threshold()
        );

        let reason = loop {
            if shutdown.load(Ordering::SeqCst) {
                let mut drained = 0usize;
                for event in rx.try_iter() {
                    self.ingest(event);
                    drained += 1;
                }
                log::info!("Shutdown requested, drained {} queued events", drained);
                break ExitReason::Interrupted;
            }

            match rx.recv_timeout(timeout) {
                Ok(event) => self.step(Some(event)),
                Err(RecvTimeoutError::Timeout) => self.step(None),
                Err(RecvTimeoutError::Disconnected) => {
                    let remaining = self.aggregator.drain();
                    self.stats.flush_cycles += 1;
                    log::info!("Event source closed, scoring {} remaining flows", remaining.len());
                    self.score_and_dispatch(remaining);
                    break ExitReason::SourceExhausted;
                }
            }
        };

        log::info!("Analysis loop stopped ({:?}): {:?}", reason, self.stats);
        reason
    }
}

// ============================================================================
// TESTS
// ============================================================================
