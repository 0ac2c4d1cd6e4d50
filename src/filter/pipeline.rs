//! Ordered filter pipeline.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;
use thiserror::Error;

/// Rejection raised by a filter. The message becomes the response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FilterError {
    message: String,
}

impl FilterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A check or transformation applied to a request before it is proxied.
pub trait PreFilter: Send + Sync {
    fn filter(&self, request: &mut Request<Body>) -> Result<(), FilterError>;
}

impl<F> PreFilter for F
where
    F: Fn(&mut Request<Body>) -> Result<(), FilterError> + Send + Sync,
{
    fn filter(&self, request: &mut Request<Body>) -> Result<(), FilterError> {
        self(request)
    }
}

/// Run `filters` in order, stopping at the first error.
pub fn run_filters(filters: &[Arc<dyn PreFilter>], request: &mut Request<Body>) -> Result<(), FilterError> {
    for filter in filters {
        filter.filter(request)?;
    }
    Ok(())
}

/// Shared, append-only list of pre-filters.
///
/// Clones share the same list. Each run works on the snapshot taken when it
/// starts.
#[derive(Clone, Default)]
pub struct FilterPipeline {
    filters: Arc<ArcSwap<Vec<Arc<dyn PreFilter>>>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter to the end of the pipeline.
    pub fn register(&self, filter: Arc<dyn PreFilter>) {
        self.filters.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(filter.clone());
            next
        });
    }

    pub fn len(&self) -> usize {
        self.filters.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every filter against `request`.
    pub fn run(&self, request: &mut Request<Body>) -> Result<(), FilterError> {
        let filters = self.filters.load();
        run_filters(&filters, request)
    }
}
