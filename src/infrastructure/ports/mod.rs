//! Port contracts for infrastructure access, discovery and persistence.

mod connector;
mod discovery;
mod marketplace;
mod repository;
mod ssh;

pub use connector::{Connector, ConnectorError, ConnectorFactory, ConnectorResult};
pub use discovery::{DiscoveryError, DiscoveryResult, ServiceDiscoverer};
pub use marketplace::{
    ComponentLoader, MarketplaceError, MarketplaceResult, MountableComponent, PluginCatalog,
};
pub use repository::{
    InfrastructureRepositoryError, InfrastructureRepositoryResult, InfrastructureStore,
    InstanceFilter, InstanceRepository, InstanceServiceRepository,
};
pub use ssh::{CommandOutput, SshClient, SshSession, SshTarget};
