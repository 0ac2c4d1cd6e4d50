//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Provider (static list, config reload, ...)
//!     → registry.rs (diff snapshot against known services)
//!     → ServiceEvent::{Added, Updated, Removed}
//!     → mpsc channel
//!     → Gateway::run (route orchestration)
//! ```
//!
//! # Design Decisions
//! - Services are immutable values; a later event with the same uid is an update
//! - Providers never touch routes directly, they only emit events
//! - Delivery order is only assumed causal per uid

pub mod provider;
pub mod registry;

use std::fmt;

use thiserror::Error;

pub use provider::StaticProvider;
pub use registry::ServiceRegistry;

/// Opaque, stable identity of a discovered service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceUid(pub String);

impl From<&str> for ServiceUid {
    fn from(uid: &str) -> Self {
        Self(uid.to_string())
    }
}

impl From<String> for ServiceUid {
    fn from(uid: String) -> Self {
        Self(uid)
    }
}

impl fmt::Display for ServiceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered backend service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Stable identity.
    pub uid: ServiceUid,
    /// Base upstream location (e.g., "http://10.0.0.7:8080").
    pub address: String,
    /// Logical name used to match endpoint templates.
    pub resource: String,
    /// Grouping label; not used for routing.
    pub namespace: String,
}

impl Service {
    pub fn new(
        uid: impl Into<ServiceUid>,
        address: impl Into<String>,
        resource: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            address: address.into(),
            resource: resource.into(),
            namespace: namespace.into(),
        }
    }
}

/// Service lifecycle event emitted by a discovery provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    Added(Service),
    Updated { old: Service, new: Service },
    Removed(Service),
}

impl ServiceEvent {
    /// Uid the event applies to (the new one for updates).
    pub fn uid(&self) -> &ServiceUid {
        match self {
            ServiceEvent::Added(s) | ServiceEvent::Removed(s) => &s.uid,
            ServiceEvent::Updated { new, .. } => &new.uid,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServiceEvent::Added(_) => "added",
            ServiceEvent::Updated { .. } => "updated",
            ServiceEvent::Removed(_) => "removed",
        }
    }
}

/// Errors raised by discovery providers.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The consumer of service events has gone away.
    #[error("service event channel closed")]
    ChannelClosed,
}
