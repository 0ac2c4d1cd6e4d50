//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (host, port, timeouts).
    pub listener: ListenerConfig,

    /// Prefix applied to every downstream route that does not carry its own.
    pub downstream_path_prefix: String,

    /// Prefix applied to every upstream URL that does not carry its own.
    pub upstream_path_prefix: String,

    /// Static endpoint templates, matched against discovered services by name.
    pub endpoints: Vec<EndpointTemplate>,

    /// Service discovery settings.
    pub discovery: DiscoveryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// True when the routing-relevant parts (templates and global prefixes)
    /// are the same in both configs.
    pub fn same_routing(&self, other: &GatewayConfig) -> bool {
        self.downstream_path_prefix == other.downstream_path_prefix
            && self.upstream_path_prefix == other.upstream_path_prefix
            && self.endpoints == other.endpoints
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl ListenerConfig {
    /// The `host:port` pair to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 30,
        }
    }
}

/// Static description of how a logical service's paths map to routes.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EndpointTemplate {
    /// Matches `Service::resource`.
    pub service_name: String,

    /// Path on the backend, appended to the upstream prefix.
    pub upstream_path: String,

    /// Overrides the global upstream prefix when set.
    pub upstream_path_prefix: String,

    /// Client-facing path below the downstream prefix. Empty means the whole
    /// prefix is routed.
    pub downstream_path: String,

    /// Overrides `<global prefix>/<service name>` when set.
    pub downstream_path_prefix: String,

    /// Allowed HTTP methods. Empty means all methods.
    pub methods: Vec<String>,
}

/// Service discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Reload the static service list when the config file changes.
    pub watch: bool,

    /// Statically declared services, published at startup.
    pub services: Vec<StaticServiceConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            watch: true,
            services: Vec::new(),
        }
    }
}

/// A statically declared backend service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StaticServiceConfig {
    /// Stable identity. Derived from namespace, resource and address when absent.
    #[serde(default)]
    pub uid: Option<String>,

    /// Base upstream URL (e.g., "http://127.0.0.1:9001").
    pub address: String,

    /// Logical name matched against endpoint templates.
    pub resource: String,

    /// Grouping label.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter, overridden by `RUST_LOG`.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "dynamic_gateway=info,tower_http=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
