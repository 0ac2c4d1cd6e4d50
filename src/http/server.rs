//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum app around the dynamic router
//! - Wire up middleware (tracing, request ID, timeout, gateway header)
//! - Bind server to listener
//! - Stop accepting on shutdown and drain in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, extract::State, http::HeaderValue, http::Request, response::Response, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::http::dispatch::{GATEWAY_HEADER, GATEWAY_HEADER_VALUE};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::routing::DynamicRouter;

/// HTTP front end of the gateway.
pub struct HttpServer {
    app: Router,
}

impl HttpServer {
    pub fn new(router: Arc<DynamicRouter>, config: &ListenerConfig) -> Self {
        Self {
            app: Self::build_app(router, config),
        }
    }

    /// Build the Axum app with all middleware layers.
    #[allow(deprecated)]
    fn build_app(router: Arc<DynamicRouter>, config: &ListenerConfig) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(router)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(SetResponseHeaderLayer::if_not_present(
                GATEWAY_HEADER,
                HeaderValue::from_static(GATEWAY_HEADER_VALUE),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The app, for embedding or driving in tests.
    pub fn into_router(self) -> Router {
        self.app
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn gateway_handler(State(router): State<Arc<DynamicRouter>>, request: Request<Body>) -> Response {
    router.dispatch(request).await
}
