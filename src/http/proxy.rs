//! Reverse proxy forwarding to a resolved endpoint.
//!
//! # Responsibilities
//! - Compute the upstream URI for a request
//! - Strip hop-by-hop headers, add forwarding headers
//! - Stream request and response bodies
//! - Map upstream failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - Prefix routes forward the path remainder below the downstream prefix
//! - Template routes forward to the fixed upstream URL, `{name}` substituted
//! - Upstream query first, then the client query
//! - No retries, no timeouts of its own

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{CONNECTION, HOST};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::http::request::RequestIdExt;
use crate::observability::metrics;
use crate::routing::matcher::{placeholders, PathPrefixMatcher};
use crate::routing::{join, MatchedRoute, PathParams, ResolvedEndpoint};

/// HTTP client used for upstream requests.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the shared upstream client.
pub fn build_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Errors raised while forwarding a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid upstream URI {uri:?}: {reason}")]
    InvalidUpstreamUri { uri: String, reason: String },

    #[error("upstream placeholder {{{0}}} has no captured value")]
    UnboundPlaceholder(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Forwards requests for one resolved endpoint.
#[derive(Clone)]
pub struct ReverseProxy {
    client: HttpClient,
    upstream_url: String,
    downstream_prefix: PathPrefixMatcher,
    prefix_route: bool,
    route: String,
}

impl ReverseProxy {
    pub fn new(client: HttpClient, endpoint: &ResolvedEndpoint) -> Self {
        Self {
            client,
            upstream_url: endpoint.upstream_url.clone(),
            downstream_prefix: PathPrefixMatcher::new(&endpoint.downstream_path_prefix),
            prefix_route: endpoint.is_prefix_route(),
            route: endpoint.downstream_pattern(),
        }
    }

    /// Upstream URL of the endpoint, before rewriting.
    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Upstream URI for a request path and query.
    pub fn target_uri(&self, path: &str, query: Option<&str>, params: &PathParams) -> Result<Uri, ProxyError> {
        let (base, base_query) = match self.upstream_url.split_once('?') {
            Some((base, q)) => (base, Some(q)),
            None => (self.upstream_url.as_str(), None),
        };

        let target_path = if self.prefix_route {
            let remainder = match self.downstream_prefix.prefix() {
                "/" => path,
                prefix => path.strip_prefix(prefix).unwrap_or(path),
            };
            join(base, remainder)
        } else {
            let substituted = params.iter().fold(base.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            });
            if let Some(name) = placeholders(&substituted).first() {
                return Err(ProxyError::UnboundPlaceholder(name.to_string()));
            }
            substituted
        };

        let query = match (base_query.filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
            (Some(a), Some(b)) => Some(format!("{}&{}", a, b)),
            (Some(a), None) => Some(a.to_string()),
            (None, Some(b)) => Some(b.to_string()),
            (None, None) => None,
        };

        let target = match query {
            Some(q) => format!("{}?{}", target_path, q),
            None => target_path,
        };

        Uri::try_from(target.as_str()).map_err(|e| ProxyError::InvalidUpstreamUri {
            uri: target.clone(),
            reason: e.to_string(),
        })
    }

    /// Forward `request` upstream and return the upstream response.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let start_time = Instant::now();
        let request_id = request.request_id().to_string();

        let params = request
            .extensions()
            .get::<MatchedRoute>()
            .map(|m| m.params.clone())
            .unwrap_or_default();
        let uri = match self.target_uri(request.uri().path(), request.uri().query(), &params) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(request_id = %request_id, route = %self.route, error = %e, "Cannot build upstream URI");
                metrics::record_upstream_request(&self.route, StatusCode::BAD_GATEWAY.as_u16(), start_time);
                return (StatusCode::BAD_GATEWAY, "Invalid upstream URL").into_response();
            }
        };

        let (mut parts, body) = request.into_parts();

        let original_host = parts.headers.remove(HOST);
        strip_hop_by_hop(&mut parts.headers);
        if let Some(host) = original_host {
            parts.headers.insert(X_FORWARDED_HOST, host);
        }
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            append_forwarded_for(&mut parts.headers, addr);
        }

        tracing::debug!(request_id = %request_id, method = %parts.method, upstream = %uri, "Forwarding request");

        parts.uri = uri;
        parts.version = Version::HTTP_11;
        let outbound = Request::from_parts(parts, body);

        match self.client.request(outbound).await {
            Ok(response) => {
                let status = response.status();
                metrics::record_upstream_request(&self.route, status.as_u16(), start_time);

                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                let e = ProxyError::from(e);
                tracing::error!(request_id = %request_id, route = %self.route, error = %e, "Upstream error");
                metrics::record_upstream_request(&self.route, StatusCode::BAD_GATEWAY.as_u16(), start_time);
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: &SocketAddr) {
    let client_ip = addr.ip().to_string();
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, client_ip),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
