//! In-memory registry of known services.
//!
//! # Responsibilities
//! - Remember the last published snapshot of services, keyed by uid
//! - Turn a new full snapshot into the lifecycle events that lead to it

use std::collections::HashMap;
use std::sync::Mutex;

use crate::discovery::{Service, ServiceEvent, ServiceUid};

/// Registry of the services a provider has published.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Mutex<HashMap<ServiceUid, Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known set with `snapshot` and return the events that
    /// describe the change.
    ///
    /// Adds and updates come out in snapshot order, removals after them in
    /// uid order. A uid repeated within the snapshot keeps its last value.
    pub fn reconcile(&self, snapshot: Vec<Service>) -> Vec<ServiceEvent> {
        let mut known = self.services.lock().unwrap_or_else(|e| e.into_inner());

        let mut order = Vec::with_capacity(snapshot.len());
        let mut next: HashMap<ServiceUid, Service> = HashMap::with_capacity(snapshot.len());
        for service in snapshot {
            if !next.contains_key(&service.uid) {
                order.push(service.uid.clone());
            }
            next.insert(service.uid.clone(), service);
        }

        let mut events = Vec::new();
        for uid in &order {
            let new = &next[uid];
            match known.get(uid) {
                None => events.push(ServiceEvent::Added(new.clone())),
                Some(old) if old != new => events.push(ServiceEvent::Updated {
                    old: old.clone(),
                    new: new.clone(),
                }),
                Some(_) => {}
            }
        }

        let mut gone: Vec<&Service> = known.values().filter(|s| !next.contains_key(&s.uid)).collect();
        gone.sort_by(|a, b| a.uid.cmp(&b.uid));
        events.extend(gone.into_iter().cloned().map(ServiceEvent::Removed));

        *known = next;
        events
    }

    /// Look up a known service.
    pub fn get(&self, uid: &ServiceUid) -> Option<Service> {
        let known = self.services.lock().unwrap_or_else(|e| e.into_inner());
        known.get(uid).cloned()
    }

    /// Number of known services.
    pub fn len(&self) -> usize {
        self.services.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
