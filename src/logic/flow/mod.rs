//! Flow Module - Per-source traffic aggregation
//!
//! Packets are folded into one accumulator per source address. A flow is
//! flushed (features extracted, entry removed) once it has been quiet for
//! longer than the inactivity window.

pub mod accumulator;
pub mod table;


pub use accumulator::FlowAccumulator;
pub use table::{FlowAggregator, FlushedFlow};
