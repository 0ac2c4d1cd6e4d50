//! Route registration and lookup.
//!
//! # Responsibilities
//! - Define the `Router` seam the gateway registers routes through
//! - Store live routes and look up the matching route for a request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Readers load an immutable snapshot (ArcSwap), no lock on the hot path
//! - Writers are serialized and rebuild the snapshot, kept sorted by precedence
//! - Explicit NotFound / MethodNotAllowed rather than silent default

use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tower::util::BoxCloneSyncService;
use tower::ServiceExt;
use uuid::Uuid;

use crate::routing::matcher::{MethodMatcher, PathMatcher, PathParams};

/// Request handler attached to a route.
pub type RouteHandler = BoxCloneSyncService<Request<Body>, Response, Infallible>;

/// Opaque identifier of a registered route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteId(String);

impl RouteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RouteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised when registering a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Malformed path pattern (e.g., unbalanced `{}`).
    #[error("invalid route pattern: {0}")]
    InvalidPattern(String),

    /// Method token is not a valid HTTP method.
    #[error("invalid HTTP method: {0:?}")]
    InvalidMethod(String),
}

/// Result type for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;

/// Route registration primitives the gateway depends on.
///
/// Implementations are called while the gateway holds the bookkeeping lock
/// for the affected service, so they must not call back into the gateway.
pub trait Router: Send + Sync {
    /// Register `handler` for `methods` (empty = all) at `path` below
    /// `path_prefix`. An empty `path` routes the whole prefix.
    fn register_route(
        &self,
        path: &str,
        path_prefix: &str,
        methods: &[String],
        handler: RouteHandler,
    ) -> RouteResult<RouteId>;

    /// Remove a route. Unknown ids are ignored.
    fn unregister_route(&self, route_id: &RouteId);
}

/// Details of the matched route, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    pub route_id: RouteId,
    pub pattern: String,
    pub params: PathParams,
}

/// Outcome of a route lookup.
pub enum RouteLookup {
    Found(RouteHandler, MatchedRoute),
    MethodNotAllowed,
    NotFound,
}

struct RouteEntry {
    id: RouteId,
    path: PathMatcher,
    methods: MethodMatcher,
    handler: RouteHandler,
    seq: u64,
}

impl RouteEntry {
    fn sort_key(&self) -> (u8, usize, u64) {
        let (kind, specificity) = self.path.precedence();
        (kind, specificity, self.seq)
    }
}

/// In-process router whose routes can be added and removed at runtime.
pub struct DynamicRouter {
    routes: ArcSwap<Vec<Arc<RouteEntry>>>,
    /// Serializes writers; holds the registration sequence number.
    writer: Mutex<u64>,
}

impl DynamicRouter {
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(0),
        }
    }

    /// Number of live routes.
    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Patterns of the live routes, in match order.
    pub fn patterns(&self) -> Vec<String> {
        self.routes
            .load()
            .iter()
            .map(|r| r.path.pattern().to_string())
            .collect()
    }

    /// Find the route for a request.
    pub fn lookup(&self, method: &Method, path: &str) -> RouteLookup {
        let routes = self.routes.load();
        let mut path_matched = false;

        for route in routes.iter() {
            if let Some(params) = route.path.match_path(path) {
                if route.methods.matches(method) {
                    let matched = MatchedRoute {
                        route_id: route.id.clone(),
                        pattern: route.path.pattern().to_string(),
                        params,
                    };
                    return RouteLookup::Found(route.handler.clone(), matched);
                }
                path_matched = true;
            }
        }

        if path_matched {
            RouteLookup::MethodNotAllowed
        } else {
            RouteLookup::NotFound
        }
    }

    /// Route a request to its handler.
    pub async fn dispatch(&self, mut request: Request<Body>) -> Response {
        match self.lookup(request.method(), request.uri().path()) {
            RouteLookup::Found(handler, matched) => {
                request.extensions_mut().insert(matched);
                match handler.oneshot(request).await {
                    Ok(response) => response,
                    Err(never) => match never {},
                }
            }
            RouteLookup::MethodNotAllowed => {
                tracing::debug!(method = %request.method(), path = %request.uri().path(), "Method not allowed");
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
            }
            RouteLookup::NotFound => {
                tracing::debug!(path = %request.uri().path(), "No route matched");
                (StatusCode::NOT_FOUND, "No matching route found").into_response()
            }
        }
    }
}

impl Default for DynamicRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for DynamicRouter {
    fn register_route(
        &self,
        path: &str,
        path_prefix: &str,
        methods: &[String],
        handler: RouteHandler,
    ) -> RouteResult<RouteId> {
        let path_matcher = PathMatcher::for_route(path, path_prefix)?;
        let method_matcher = MethodMatcher::parse(methods)?;
        let id = RouteId::generate();
        let pattern = path_matcher.pattern().to_string();

        let mut seq = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        *seq += 1;

        let entry = Arc::new(RouteEntry {
            id: id.clone(),
            path: path_matcher,
            methods: method_matcher,
            handler,
            seq: *seq,
        });

        let current = self.routes.load_full();
        let mut next: Vec<Arc<RouteEntry>> = current.iter().cloned().collect();
        let key = entry.sort_key();
        let position = next.partition_point(|r| r.sort_key() < key);
        next.insert(position, entry);
        self.routes.store(Arc::new(next));

        tracing::debug!(route_id = %id, pattern = %pattern, methods = ?methods, "Route registered");
        Ok(id)
    }

    fn unregister_route(&self, route_id: &RouteId) {
        let _seq = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.routes.load_full();
        let next: Vec<Arc<RouteEntry>> = current
            .iter()
            .filter(|r| &r.id != route_id)
            .cloned()
            .collect();

        if next.len() == current.len() {
            tracing::debug!(route_id = %route_id, "Unregister for unknown route ignored");
            return;
        }

        self.routes.store(Arc::new(next));
        tracing::debug!(route_id = %route_id, "Route unregistered");
    }
}
