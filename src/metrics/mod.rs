//! In-process metrics: a concurrent registry of counters and gauges
//! keyed by metric name plus label dimensions.
//!
//! Collaborators push `(name, labels, value)` observations from
//! arbitrarily many tasks with no external coordination; the scrape
//! endpoint renders the accumulated state as plain text on demand.
//! Locking is two-level — one lock for the name→family map, one per
//! family for its series — so writers to unrelated metrics never
//! queue behind each other.

pub mod export;
pub mod labels;
pub mod registry;

pub use registry::{CounterHandle, GaugeHandle, MetricKind, MetricsError, Registry};
