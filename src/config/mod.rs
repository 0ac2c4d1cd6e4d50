//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → templates + prefixes handed to the gateway at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → static service list reconciled into discovery events
//! ```
//!
//! # Design Decisions
//! - Endpoint templates are read-only at runtime; changing them requires a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError, ConfigResult};
pub use schema::{
    DiscoveryConfig, EndpointTemplate, GatewayConfig, ListenerConfig, ObservabilityConfig,
    StaticServiceConfig,
};
pub use validation::ValidationError;
pub use watcher::{ConfigWatcher, ServiceReload};
