//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (add request ID)
//!     → [routing layer picks the route handler]
//!     → dispatch.rs (pre-filters, gateway header)
//!     → proxy.rs (rewrite, forward, stream back)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod proxy;
pub mod request;
pub mod server;

pub use dispatch::{DispatchHandler, DispatchHandlerFactory, GATEWAY_HEADER, GATEWAY_HEADER_VALUE};
pub use proxy::{build_client, HttpClient, ProxyError, ReverseProxy};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
