//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Reload and validate the config file when it changes
//! - Emit the static service list when it differs from the last one sent
//! - Warn when templates or prefixes changed, since those need a restart
//!
//! # Design Decisions
//! - A file that fails to load or validate is ignored, the running set stays
//! - Editors often fire several events per save; unchanged lists are dropped

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{GatewayConfig, StaticServiceConfig};

/// Decides which reloaded configs produce a service list update.
#[derive(Debug)]
pub struct ServiceReload {
    startup: GatewayConfig,
    last_sent: Vec<StaticServiceConfig>,
}

impl ServiceReload {
    /// Track reloads against the config the process started with.
    pub fn new(startup: GatewayConfig) -> Self {
        let last_sent = startup.discovery.services.clone();
        Self { startup, last_sent }
    }

    /// The services to publish for `reloaded`, or `None` when unchanged.
    pub fn apply(&mut self, reloaded: GatewayConfig) -> Option<Vec<StaticServiceConfig>> {
        if !self.startup.same_routing(&reloaded) {
            tracing::warn!("Endpoint templates or prefixes changed, restart to apply them");
        }

        let services = reloaded.discovery.services;
        if services == self.last_sent {
            tracing::debug!("Service list unchanged after reload");
            return None;
        }

        self.last_sent = services.clone();
        Some(services)
    }
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    reload: ServiceReload,
    update_tx: mpsc::UnboundedSender<Vec<StaticServiceConfig>>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, started from `current`.
    ///
    /// Returns the watcher and a receiver for changed service lists.
    pub fn new(
        path: &Path,
        current: &GatewayConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<StaticServiceConfig>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                reload: ServiceReload::new(current.clone()),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let reload = Mutex::new(self.reload);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let mut reload = reload.lock().unwrap_or_else(|e| e.into_inner());
                        if let Some(services) = reload_services(&path, &mut reload) {
                            let _ = tx.send(services);
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and return the service list if it changed.
pub fn reload_services(path: &Path, reload: &mut ServiceReload) -> Option<Vec<StaticServiceConfig>> {
    tracing::info!(path = ?path, "Config file change detected, reloading");
    match load_config(path) {
        Ok(config) => reload.apply(config),
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current services");
            None
        }
    }
}
