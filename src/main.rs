//! Dynamic API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Discovery provider ──▶ ServiceEvent ──▶ Gateway ──▶ Router (register/unregister)
//!
//!     Client Request ──▶ HttpServer ──▶ DynamicRouter ──▶ pre-filters ──▶ reverse proxy ──▶ Service
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use dynamic_gateway::config::{load_config, ConfigWatcher};
use dynamic_gateway::lifecycle::shutdown_signal;
use dynamic_gateway::observability::{init_logging, init_metrics};
use dynamic_gateway::{DynamicRouter, Gateway, HttpServer, Shutdown, StaticProvider};

#[derive(Parser, Debug)]
#[command(name = "dynamic-gateway", version, about = "API gateway with routes driven by service discovery")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    init_logging(&config.observability)?;
    tracing::info!("dynamic-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address(),
        endpoints = config.endpoints.len(),
        services = config.discovery.services.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Err(e) = init_metrics(&config.observability.metrics_address) {
            tracing::error!(error = %e, "Metrics disabled");
        }
    }

    let shutdown = Shutdown::new();
    let router = Arc::new(DynamicRouter::new());
    let gateway = Arc::new(Gateway::from_config(&config, router.clone()));

    let (provider, events) = StaticProvider::new();
    let gateway_task = tokio::spawn(gateway.clone().run(events, shutdown.subscribe()));
    provider.publish_config(&config.discovery.services)?;

    // Kept alive for the lifetime of the process.
    let _watcher = if config.discovery.watch {
        let (watcher, mut updates) = ConfigWatcher::new(&cli.config, &config);
        let watcher = watcher.run()?;

        tokio::spawn(async move {
            while let Some(services) = updates.recv().await {
                match provider.publish_config(&services) {
                    Ok(events) => tracing::info!(events, "Service list reloaded"),
                    Err(e) => {
                        tracing::error!(error = %e, "Cannot publish reloaded services");
                        break;
                    }
                }
            }
        });
        Some(watcher)
    } else {
        None
    };

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(router, &config.listener);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();

    server_task.await??;
    gateway_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
