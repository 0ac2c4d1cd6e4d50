//! Gateway orchestration.
//!
//! # Data Flow
//! ```text
//! Discovery provider
//!     → ServiceEvent (added / updated / removed)
//!     → orchestrator.rs (resolve endpoints, build handlers)
//!     → Router (register / unregister routes)
//!     → route table (service uid → route ids)
//! ```
//!
//! # Design Decisions
//! - Events for the same service are serialized, different services proceed concurrently
//! - A route the router refuses is logged and skipped, the rest still register
//! - Update is remove then add: a brief window with no routes is accepted

pub mod orchestrator;

pub use orchestrator::Gateway;
