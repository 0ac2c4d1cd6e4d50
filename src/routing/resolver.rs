//! Endpoint resolution.
//!
//! # Responsibilities
//! - Select the endpoint templates that belong to a discovered service
//! - Apply prefix defaulting and compose the upstream URL
//! - Synthesize a catch-all route when no template matches
//!
//! # Design Decisions
//! - Template declaration order is preserved
//! - Never fails; every service resolves to at least one endpoint

use crate::config::EndpointTemplate;
use crate::discovery::Service;
use crate::routing::path::join;

/// A concrete route computed for one discovered service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Fully composed target location.
    pub upstream_url: String,
    pub upstream_path: String,
    pub upstream_path_prefix: String,
    pub downstream_path: String,
    pub downstream_path_prefix: String,
    /// Empty means all methods.
    pub methods: Vec<String>,
}

impl ResolvedEndpoint {
    /// Client-facing pattern this endpoint is served at.
    pub fn downstream_pattern(&self) -> String {
        join(&self.downstream_path_prefix, &self.downstream_path)
    }

    /// True for routes covering a whole prefix rather than one path.
    pub fn is_prefix_route(&self) -> bool {
        self.downstream_path.is_empty()
    }
}

/// Resolves discovered services against the static endpoint templates.
#[derive(Debug, Clone, Default)]
pub struct EndpointResolver {
    templates: Vec<EndpointTemplate>,
    downstream_path_prefix: String,
    upstream_path_prefix: String,
}

impl EndpointResolver {
    pub fn new(
        templates: Vec<EndpointTemplate>,
        downstream_path_prefix: impl Into<String>,
        upstream_path_prefix: impl Into<String>,
    ) -> Self {
        Self {
            templates,
            downstream_path_prefix: downstream_path_prefix.into(),
            upstream_path_prefix: upstream_path_prefix.into(),
        }
    }

    /// Compute the endpoints that should exist for `service`.
    pub fn resolve(&self, service: &Service) -> Vec<ResolvedEndpoint> {
        resolve(
            &self.templates,
            &self.downstream_path_prefix,
            &self.upstream_path_prefix,
            service,
        )
    }
}

/// Compute the endpoints that should exist for `service`.
pub fn resolve(
    templates: &[EndpointTemplate],
    downstream_path_prefix: &str,
    upstream_path_prefix: &str,
    service: &Service,
) -> Vec<ResolvedEndpoint> {
    let default_downstream = join(downstream_path_prefix, &service.resource);

    let mut endpoints: Vec<ResolvedEndpoint> = templates
        .iter()
        .filter(|t| t.service_name == service.resource)
        .map(|t| {
            let downstream_prefix = if t.downstream_path_prefix.is_empty() {
                default_downstream.clone()
            } else {
                t.downstream_path_prefix.clone()
            };
            let upstream_prefix = if t.upstream_path_prefix.is_empty() {
                upstream_path_prefix.to_string()
            } else {
                t.upstream_path_prefix.clone()
            };

            ResolvedEndpoint {
                upstream_url: join(&service.address, &join(&upstream_prefix, &t.upstream_path)),
                upstream_path: t.upstream_path.clone(),
                upstream_path_prefix: upstream_prefix,
                downstream_path: t.downstream_path.clone(),
                downstream_path_prefix: downstream_prefix,
                methods: t.methods.clone(),
            }
        })
        .collect();

    if endpoints.is_empty() {
        tracing::info!(
            uid = %service.uid,
            resource = %service.resource,
            address = %service.address,
            "No endpoint template for service, applying default route"
        );
        endpoints.push(ResolvedEndpoint {
            upstream_url: join(&service.address, upstream_path_prefix),
            upstream_path: String::new(),
            upstream_path_prefix: upstream_path_prefix.to_string(),
            downstream_path: String::new(),
            downstream_path_prefix: default_downstream,
            methods: Vec::new(),
        });
    }

    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(service_name: &str, downstream_path: &str, upstream_path: &str) -> EndpointTemplate {
        EndpointTemplate {
            service_name: service_name.into(),
            downstream_path: downstream_path.into(),
            upstream_path: upstream_path.into(),
            ..Default::default()
        }
    }

    fn service(resource: &str) -> Service {
        Service::new(format!("{}-uid", resource), "http://kube-worker1:32344", resource, "gateway")
    }

    #[test]
    fn test_fallback_when_no_template_matches() {
        let templates = vec![template("api2", "/users", "/users")];
        let endpoints = resolve(&templates, "/api", "/internal", &service("api1"));

        assert_eq!(
            endpoints,
            vec![ResolvedEndpoint {
                upstream_url: "http://kube-worker1:32344/internal".into(),
                upstream_path: "".into(),
                upstream_path_prefix: "/internal".into(),
                downstream_path: "".into(),
                downstream_path_prefix: "/api/api1".into(),
                methods: vec![],
            }]
        );
        assert!(endpoints[0].is_prefix_route());
        assert_eq!(endpoints[0].downstream_pattern(), "/api/api1");
    }

    #[test]
    fn test_fallback_without_prefixes() {
        let endpoints = resolve(&[], "", "", &service("api1"));
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].upstream_url, "http://kube-worker1:32344");
        assert_eq!(endpoints[0].downstream_path_prefix, "api1");
    }

    #[test]
    fn test_only_matching_templates_in_declaration_order() {
        let templates = vec![
            template("api1", "/orders", "/v1/orders"),
            template("api2", "/users", "/v1/users"),
            template("api1", "/items", "/v1/items"),
        ];

        let endpoints = resolve(&templates, "/api", "", &service("api1"));

        let paths: Vec<_> = endpoints.iter().map(|e| e.downstream_path.as_str()).collect();
        assert_eq!(paths, vec!["/orders", "/items"]);
        assert_eq!(endpoints[0].upstream_url, "http://kube-worker1:32344/v1/orders");
        assert_eq!(endpoints[0].downstream_pattern(), "/api/api1/orders");
    }

    #[test]
    fn test_template_prefixes_override_globals() {
        let templates = vec![EndpointTemplate {
            service_name: "api1".into(),
            downstream_path_prefix: "/public".into(),
            upstream_path_prefix: "/svc/".into(),
            upstream_path: "/status".into(),
            downstream_path: "/health".into(),
            methods: vec!["GET".into()],
        }];

        let endpoints = resolve(&templates, "/api", "/internal", &service("api1"));

        assert_eq!(endpoints.len(), 1);
        let e = &endpoints[0];
        assert_eq!(e.downstream_path_prefix, "/public");
        assert_eq!(e.upstream_path_prefix, "/svc/");
        assert_eq!(e.upstream_url, "http://kube-worker1:32344/svc/status");
        assert_eq!(e.methods, vec!["GET"]);
        assert_eq!(e.downstream_pattern(), "/public/health");
    }

    #[test]
    fn test_global_upstream_prefix_applies_to_templates() {
        let templates = vec![template("api1", "", "")];
        let mut svc = service("api1");
        svc.address = "http://downstream-api-1.gateway/".into();

        let endpoints = EndpointResolver::new(templates, "/", "/internal/").resolve(&svc);

        assert_eq!(endpoints[0].upstream_url, "http://downstream-api-1.gateway/internal/");
        assert_eq!(endpoints[0].downstream_path_prefix, "/api1");
    }
}
