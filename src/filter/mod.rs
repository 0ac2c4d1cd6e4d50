//! Pre-dispatch request filters.
//!
//! # Data Flow
//! ```text
//! Matched route handler
//!     → pipeline.rs (run filters in registration order)
//!     → first error: stop, 500 with the filter's message
//!     → all ok: forward to upstream
//! ```
//!
//! # Design Decisions
//! - Append-only: filters are never removed once registered
//! - Filters registered after a route was built still apply to it
//! - No rollback: filters own the safety of their own side effects

pub mod pipeline;

pub use pipeline::{run_filters, FilterError, FilterPipeline, PreFilter};
