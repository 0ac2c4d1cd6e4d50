//! Static service discovery provider.
//!
//! Publishes a declared list of services, such as the `[[discovery.services]]`
//! section of the config file. Republishing a changed list emits the
//! update and removal events needed to converge.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::StaticServiceConfig;
use crate::discovery::{DiscoveryError, Service, ServiceEvent, ServiceRegistry, ServiceUid};

/// Provider backed by a fixed, republishable list of services.
pub struct StaticProvider {
    registry: Arc<ServiceRegistry>,
    events: mpsc::UnboundedSender<ServiceEvent>,
}

impl StaticProvider {
    /// Create a provider and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServiceEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                registry: Arc::new(ServiceRegistry::new()),
                events,
            },
            rx,
        )
    }

    /// The registry holding the last published services.
    pub fn registry(&self) -> Arc<ServiceRegistry> {
        self.registry.clone()
    }

    /// Publish a full list of services. Returns the number of events sent.
    pub fn publish(&self, services: Vec<Service>) -> Result<usize, DiscoveryError> {
        let events = self.registry.reconcile(services);
        let count = events.len();

        for event in events {
            tracing::info!(
                event = event.kind(),
                uid = %event.uid(),
                "Service discovery event"
            );
            self.events.send(event).map_err(|_| DiscoveryError::ChannelClosed)?;
        }

        Ok(count)
    }

    /// Publish services declared in configuration.
    pub fn publish_config(&self, services: &[StaticServiceConfig]) -> Result<usize, DiscoveryError> {
        self.publish(services.iter().map(service_from_config).collect())
    }
}

/// Build a `Service` from its config entry, deriving a uid when none is set.
pub fn service_from_config(config: &StaticServiceConfig) -> Service {
    let uid = match &config.uid {
        Some(uid) => ServiceUid(uid.clone()),
        None => ServiceUid(format!("{}/{}@{}", config.namespace, config.resource, config.address)),
    };

    Service {
        uid,
        address: config.address.clone(),
        resource: config.resource.clone(),
        namespace: config.namespace.clone(),
    }
}
