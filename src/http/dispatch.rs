//! Per-endpoint request handlers.
//!
//! # Responsibilities
//! - Build one handler per resolved endpoint
//! - Run the shared pre-filter pipeline
//! - Reject with 500 and the filter's message on failure
//! - Forward to the endpoint's upstream otherwise
//! - Mark every response with the gateway header

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::service_fn;
use tower::util::BoxCloneSyncService;

use crate::filter::{FilterError, FilterPipeline};
use crate::http::proxy::{build_client, HttpClient, ReverseProxy};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;
use crate::routing::{ResolvedEndpoint, RouteHandler};

/// Header identifying responses produced by the gateway.
pub const GATEWAY_HEADER: HeaderName = HeaderName::from_static("x-gateway");

/// Value of [`GATEWAY_HEADER`].
pub const GATEWAY_HEADER_VALUE: &str = "dynamic-gateway";

/// Builds route handlers that share one filter pipeline and one client.
#[derive(Clone)]
pub struct DispatchHandlerFactory {
    filters: FilterPipeline,
    client: HttpClient,
}

impl DispatchHandlerFactory {
    pub fn new(filters: FilterPipeline) -> Self {
        Self::with_client(filters, build_client())
    }

    pub fn with_client(filters: FilterPipeline, client: HttpClient) -> Self {
        Self { filters, client }
    }

    pub fn filters(&self) -> &FilterPipeline {
        &self.filters
    }

    /// Handler for `endpoint`.
    pub fn build(&self, endpoint: &ResolvedEndpoint) -> RouteHandler {
        let handler = Arc::new(DispatchHandler {
            filters: self.filters.clone(),
            proxy: ReverseProxy::new(self.client.clone(), endpoint),
        });

        BoxCloneSyncService::new(service_fn(move |request: Request<Body>| {
            let handler = handler.clone();
            async move { Ok::<_, Infallible>(handler.handle(request).await) }
        }))
    }
}

/// Filters then forwards requests for one endpoint.
pub struct DispatchHandler {
    filters: FilterPipeline,
    proxy: ReverseProxy,
}

impl DispatchHandler {
    pub async fn handle(&self, mut request: Request<Body>) -> Response {
        let mut response = match self.filters.run(&mut request) {
            Ok(()) => self.proxy.forward(request).await,
            Err(e) => {
                tracing::warn!(
                    request_id = %request.request_id(),
                    path = %request.uri().path(),
                    error = %e,
                    "Request rejected by filter"
                );
                metrics::record_filter_rejection();
                filter_error_response(&e)
            }
        };

        response
            .headers_mut()
            .insert(GATEWAY_HEADER, HeaderValue::from_static(GATEWAY_HEADER_VALUE));
        response
    }
}

/// 500 response carrying the filter's message as an HTML body.
pub fn filter_error_response(error: &FilterError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, "text/html")],
        error.message().to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn endpoint() -> ResolvedEndpoint {
        ResolvedEndpoint {
            upstream_url: "http://127.0.0.1:1".into(),
            upstream_path: String::new(),
            upstream_path_prefix: String::new(),
            downstream_path: String::new(),
            downstream_path_prefix: "/api/api1".into(),
            methods: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_filter_rejection_short_circuits() {
        let pipeline = FilterPipeline::new();
        let later = Arc::new(AtomicUsize::new(0));
        pipeline.register(Arc::new(|_req: &mut Request<Body>| Ok::<_, FilterError>(())));
        pipeline.register(Arc::new(|_req: &mut Request<Body>| -> Result<(), FilterError> {
            Err(FilterError::new("boom"))
        }));
        let counter = later.clone();
        pipeline.register(Arc::new(move |_req: &mut Request<Body>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, FilterError>(())
        }));

        let handler = DispatchHandlerFactory::new(pipeline).build(&endpoint());
        let request = Request::builder().uri("/api/api1").body(Body::empty()).unwrap();
        let response = handler.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(response.headers()[GATEWAY_HEADER], GATEWAY_HEADER_VALUE);
        assert_eq!(later.load(Ordering::SeqCst), 0);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"boom");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let handler = DispatchHandlerFactory::new(FilterPipeline::new()).build(&endpoint());
        let request = Request::builder().uri("/api/api1/x").body(Body::empty()).unwrap();
        let response = handler.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()[GATEWAY_HEADER], GATEWAY_HEADER_VALUE);
    }
}
