use std::collections::HashMap;

use crate::logic::events::PacketEvent;
use crate::logic::features::FeatureVector;
use super::accumulator::FlowAccumulator;

/// A flow evicted by [`FlowAggregator::flush`], ready for scoring
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedFlow {
    pub key: String,
    pub features: FeatureVector,
}

/// Live table of per-source accumulators.
///
/// Owned by the loop controller; single writer, no locking. The table has
/// no size cap: a flood of spoofed source addresses grows it until those
/// flows go quiet for the window, so memory is bounded only by traffic.
#[derive(Debug)]
pub struct FlowAggregator {
    window_secs: f64,
    flows: HashMap<String, FlowAccumulator>,
}

impl FlowAggregator {
    pub fn new(window_secs: f64) -> Self {
        Self {
            window_secs,
            flows: HashMap::new(),
        }
    }

    /// Fold one packet into its source's accumulator
    pub fn ingest(&mut self, event: &PacketEvent) {
        self.flows
            .entry(event.source.clone())
            .or_default()
            .record(event);
    }

    /// Evict every flow quiet for more than the window as of `now`.
    ///
    /// Active flows keep accumulating; a flow is only scored once it goes
    /// quiet. Output is sorted by key.
    pub fn flush(&mut self, now: f64) -> Vec<FlushedFlow> {
        let window = self.window_secs;
        let mut idle: Vec<String> = self.flows
            .iter()
            .filter(|(_, flow)| flow.is_idle(now, window))
            .map(|(key, _)| key.clone())
            .collect();
        idle.sort();

        idle.into_iter()
            .filter_map(|key| {
                let flow = self.flows.remove(&key)?;
                Some(FlushedFlow {
                    features: FeatureVector::from_flow(&flow),
                    key,
                })
            })
            .collect()
    }

    /// Evict every flow regardless of activity, sorted by key.
    /// Used once when the event source is exhausted.
    pub fn drain(&mut self) -> Vec<FlushedFlow> {
        let mut flows: Vec<FlushedFlow> = self.flows
            .drain()
            .map(|(key, flow)| FlushedFlow {
                features: FeatureVector::from_flow(&flow),
                key,
            })
            .collect();
        flows.sort_by(|a, b| a.key.cmp(&b.key));
        flows
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&FlowAccumulator> {
        self.flows.get(key)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
