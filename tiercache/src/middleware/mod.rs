//! Built-in decorators
//!
//! - Logging: `tracing` events around every layer call
//! - Metrics: Prometheus counters and latency histograms per layer

pub mod logging;
pub mod metrics;

pub use logging::{LoggingStore, logging_decorator};
pub use metrics::{MetricsStore, metrics_decorator};
