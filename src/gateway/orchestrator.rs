//! Service lifecycle to route lifecycle.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use crate::config::GatewayConfig;
use crate::discovery::{Service, ServiceEvent, ServiceUid};
use crate::filter::{FilterPipeline, PreFilter};
use crate::http::DispatchHandlerFactory;
use crate::observability::metrics;
use crate::routing::{EndpointResolver, RouteId, Router};

/// Keeps the router's routes in step with discovered services.
pub struct Gateway {
    resolver: EndpointResolver,
    router: Arc<dyn Router>,
    handlers: DispatchHandlerFactory,
    /// Route IDs registered for each service.
    routes: DashMap<ServiceUid, Vec<RouteId>>,
}

impl Gateway {
    pub fn new(resolver: EndpointResolver, router: Arc<dyn Router>) -> Self {
        Self::with_handlers(resolver, router, DispatchHandlerFactory::new(FilterPipeline::new()))
    }

    pub fn with_handlers(
        resolver: EndpointResolver,
        router: Arc<dyn Router>,
        handlers: DispatchHandlerFactory,
    ) -> Self {
        Self {
            resolver,
            router,
            handlers,
            routes: DashMap::new(),
        }
    }

    /// Gateway for the templates and prefixes in `config`.
    pub fn from_config(config: &GatewayConfig, router: Arc<dyn Router>) -> Self {
        let resolver = EndpointResolver::new(
            config.endpoints.clone(),
            config.downstream_path_prefix.clone(),
            config.upstream_path_prefix.clone(),
        );
        Self::new(resolver, router)
    }

    /// Append a pre-filter. Applies to existing and future routes.
    pub fn register_filter(&self, filter: Arc<dyn PreFilter>) {
        self.handlers.filters().register(filter);
        tracing::debug!(filters = self.handlers.filters().len(), "Pre-filter registered");
    }

    pub fn filters(&self) -> &FilterPipeline {
        self.handlers.filters()
    }

    /// Route IDs currently held for `uid`.
    pub fn route_ids(&self, uid: &ServiceUid) -> Option<Vec<RouteId>> {
        self.routes.get(uid).map(|ids| ids.value().clone())
    }

    /// Number of services currently holding a route table entry.
    pub fn service_count(&self) -> usize {
        self.routes.len()
    }

    /// Register routes for every endpoint of `service`.
    pub fn on_service_added(&self, service: &Service) {
        let entry = self.routes.entry(service.uid.clone());
        if let Entry::Occupied(existing) = &entry {
            tracing::warn!(
                uid = %service.uid,
                routes = existing.get().len(),
                "Service added twice, previous routes are no longer tracked"
            );
        }

        let ids = self.register_endpoints(service);
        tracing::info!(uid = %service.uid, address = %service.address, routes = ids.len(), "Service added");
        drop(entry.insert(ids));

        metrics::set_services(self.routes.len());
    }

    /// Unregister every route held for `service`.
    pub fn on_service_removed(&self, service: &Service) {
        match self.routes.remove(&service.uid) {
            Some((_, ids)) => {
                self.unregister_all(&ids);
                tracing::info!(uid = %service.uid, routes = ids.len(), "Service removed");
            }
            None => {
                tracing::debug!(uid = %service.uid, "Removal for unknown service ignored");
            }
        }

        metrics::set_services(self.routes.len());
    }

    /// Replace the routes of `old` with routes for `new`.
    pub fn on_service_updated(&self, old: &Service, new: &Service) {
        if old.uid != new.uid {
            self.on_service_removed(old);
            self.on_service_added(new);
            return;
        }

        match self.routes.entry(new.uid.clone()) {
            Entry::Occupied(mut existing) => {
                self.unregister_all(existing.get());
                let ids = self.register_endpoints(new);
                tracing::info!(uid = %new.uid, address = %new.address, routes = ids.len(), "Service updated");
                *existing.get_mut() = ids;
            }
            Entry::Vacant(vacant) => {
                let ids = self.register_endpoints(new);
                tracing::info!(uid = %new.uid, address = %new.address, routes = ids.len(), "Service updated");
                vacant.insert(ids);
            }
        }

        metrics::set_services(self.routes.len());
    }

    pub fn handle_event(&self, event: ServiceEvent) {
        tracing::debug!(uid = %event.uid(), kind = event.kind(), "Service event");
        match event {
            ServiceEvent::Added(service) => self.on_service_added(&service),
            ServiceEvent::Updated { old, new } => self.on_service_updated(&old, &new),
            ServiceEvent::Removed(service) => self.on_service_removed(&service),
        }
    }

    /// Apply events until the channel closes or shutdown fires.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<ServiceEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!("Gateway event loop started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::info!("Service event stream closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Gateway event loop shutting down");
                    break;
                }
            }
        }
    }

    fn register_endpoints(&self, service: &Service) -> Vec<RouteId> {
        let endpoints = self.resolver.resolve(service);
        let mut ids = Vec::with_capacity(endpoints.len());

        for endpoint in &endpoints {
            let handler = self.handlers.build(endpoint);
            match self.router.register_route(
                &endpoint.downstream_path,
                &endpoint.downstream_path_prefix,
                &endpoint.methods,
                handler,
            ) {
                Ok(id) => {
                    tracing::debug!(
                        uid = %service.uid,
                        route_id = %id,
                        route = %endpoint.downstream_pattern(),
                        upstream = %endpoint.upstream_url,
                        "Route registered"
                    );
                    metrics::record_route_registered();
                    ids.push(id);
                }
                Err(e) => {
                    tracing::warn!(
                        uid = %service.uid,
                        route = %endpoint.downstream_pattern(),
                        error = %e,
                        "Route registration failed"
                    );
                    metrics::record_registration_failure();
                }
            }
        }

        ids
    }

    fn unregister_all(&self, ids: &[RouteId]) {
        for id in ids {
            self.router.unregister_route(id);
        }
        metrics::record_routes_unregistered(ids.len());
    }
}
