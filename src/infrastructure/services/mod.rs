//! Application services orchestrating registry, discovery, health, tags and
//! plugin bindings.

mod binding;
mod connection;
mod discovery;
mod error;
mod health;
mod registry;
mod tags;

pub use binding::BindingService;
pub use connection::ConnectionService;
pub use discovery::{DiscoveryService, SweepReport};
pub use error::{InfrastructureServiceError, InfrastructureServiceResult};
pub use health::{HealthMonitor, ProbeFailure, ProbeReport};
pub use registry::InstanceRegistryService;
pub use tags::TagService;
