//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port > 0, timeout > 0, paths rooted)
//! - Check that upstream `{name}` placeholders are bound by the downstream path
//! - Check static services (absolute http URLs, unique uids)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::schema::{EndpointTemplate, GatewayConfig};
use crate::routing::matcher::{placeholders, PathTemplate};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port must be non-zero")]
    ZeroPort,

    #[error("listener.request_timeout_secs must be non-zero")]
    ZeroTimeout,

    #[error("{field} must be empty or start with '/', got {value:?}")]
    UnrootedPath { field: String, value: String },

    #[error("endpoints[{index}].service_name must not be empty")]
    MissingServiceName { index: usize },

    #[error("endpoints[{index}] has invalid HTTP method {method:?}")]
    InvalidMethod { index: usize, method: String },

    #[error("endpoints[{index}].downstream_path {value:?} is not a valid route pattern")]
    InvalidPattern { index: usize, value: String },

    #[error("endpoints[{index}] upstream placeholder {{{name}}} is not captured by downstream_path")]
    UnboundPlaceholder { index: usize, name: String },

    #[error("discovery.services[{index}].address {address:?} is not an absolute http(s) URL")]
    InvalidAddress { index: usize, address: String },

    #[error("discovery.services[{index}].resource must not be empty")]
    MissingResource { index: usize },

    #[error("discovery.services uid {0:?} is declared more than once")]
    DuplicateUid(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    check_rooted(&mut errors, "downstream_path_prefix".into(), &config.downstream_path_prefix);
    check_rooted(&mut errors, "upstream_path_prefix".into(), &config.upstream_path_prefix);

    for (index, endpoint) in config.endpoints.iter().enumerate() {
        if endpoint.service_name.trim().is_empty() {
            errors.push(ValidationError::MissingServiceName { index });
        }
        for method in &endpoint.methods {
            if Method::from_bytes(method.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    index,
                    method: method.clone(),
                });
            }
        }
        let paths = [
            ("downstream_path", &endpoint.downstream_path),
            ("downstream_path_prefix", &endpoint.downstream_path_prefix),
            ("upstream_path", &endpoint.upstream_path),
            ("upstream_path_prefix", &endpoint.upstream_path_prefix),
        ];
        for (name, value) in paths {
            check_rooted(&mut errors, format!("endpoints[{}].{}", index, name), value);
        }
        check_placeholders(&mut errors, index, endpoint);
    }

    let mut seen = HashSet::new();
    for (index, service) in config.discovery.services.iter().enumerate() {
        let valid_url = Url::parse(&service.address)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid_url {
            errors.push(ValidationError::InvalidAddress {
                index,
                address: service.address.clone(),
            });
        }
        if service.resource.trim().is_empty() {
            errors.push(ValidationError::MissingResource { index });
        }
        if let Some(uid) = &service.uid {
            if !seen.insert(uid.clone()) {
                errors.push(ValidationError::DuplicateUid(uid.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every placeholder on the upstream side must be captured downstream, or
/// it would be forwarded literally.
fn check_placeholders(errors: &mut Vec<ValidationError>, index: usize, endpoint: &EndpointTemplate) {
    let mut upstream = placeholders(&endpoint.upstream_path_prefix);
    upstream.extend(placeholders(&endpoint.upstream_path));
    if upstream.is_empty() {
        return;
    }

    let captured: Vec<String> = if endpoint.downstream_path.is_empty() {
        Vec::new()
    } else {
        match PathTemplate::parse(&endpoint.downstream_path) {
            Ok(template) => template.param_names().map(String::from).collect(),
            Err(_) => {
                errors.push(ValidationError::InvalidPattern {
                    index,
                    value: endpoint.downstream_path.clone(),
                });
                return;
            }
        }
    };

    for name in upstream {
        if !captured.iter().any(|c| c == name) {
            errors.push(ValidationError::UnboundPlaceholder {
                index,
                name: name.to_string(),
            });
        }
    }
}

fn check_rooted(errors: &mut Vec<ValidationError>, field: String, value: &str) {
    if !value.is_empty() && !value.starts_with('/') {
        errors.push(ValidationError::UnrootedPath {
            field,
            value: value.to_string(),
        });
    }
}
