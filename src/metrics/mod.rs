pub mod collector;
pub mod snapshot;

pub use collector::{MetricsCollector, SkipReason};
pub use snapshot::MetricsSnapshot;
