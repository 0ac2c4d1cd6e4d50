//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all request logs
//! - Metrics are no-ops until a recorder is installed
//! - RUST_LOG overrides the configured log level

pub mod logging;
pub mod metrics;

use thiserror::Error;

pub use logging::init_logging;
pub use metrics::init_metrics;

/// Errors raised while setting up observability.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("invalid metrics address {0:?}")]
    InvalidAddress(String),

    #[error("failed to install metrics recorder: {0}")]
    MetricsInit(String),

    #[error("failed to install log subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}
