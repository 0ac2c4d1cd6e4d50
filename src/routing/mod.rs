//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Service discovered
//!     → resolver.rs (templates + service → resolved endpoints)
//!     → path.rs (prefix/path composition)
//!     → router.rs (register route, get RouteId)
//!
//! Incoming Request (method, path)
//!     → router.rs (snapshot lookup)
//!     → matcher.rs (evaluate path and method conditions)
//!     → Return: matched route handler, 405, or 404
//! ```
//!
//! # Design Decisions
//! - Routes change at runtime as services come and go
//! - No regex in hot path (prefix and segment matching only)
//! - Deterministic: most specific route wins, then registration order

pub mod matcher;
pub mod path;
pub mod resolver;
pub mod router;

pub use matcher::PathParams;
pub use path::join;
pub use resolver::{resolve, EndpointResolver, ResolvedEndpoint};
pub use router::{
    DynamicRouter, MatchedRoute, RouteError, RouteHandler, RouteId, RouteLookup, RouteResult, Router,
};
