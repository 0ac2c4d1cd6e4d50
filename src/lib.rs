//! Dynamic API gateway library.
//!
//! Routes follow services as a discovery provider reports them. Each
//! service resolves to one or more endpoints, each endpoint becomes a route,
//! and each route proxies to the service after running the pre-filters.

// Core subsystems
pub mod config;
pub mod discovery;
pub mod gateway;
pub mod http;
pub mod routing;

// Request handling
pub mod filter;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use discovery::{Service, ServiceEvent, ServiceUid, StaticProvider};
pub use filter::{FilterError, PreFilter};
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{DynamicRouter, Router};
