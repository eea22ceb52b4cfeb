//! Domain model for infrastructure instances and the services they run.
//!
//! The infrastructure domain models registered compute targets, their
//! connection credentials, health snapshots, discovered services, management
//! plugin bindings and derived capability tags. Transport and storage
//! concerns remain outside this boundary.

mod connection;
mod error;
mod health;
mod ids;
mod instance;
mod plugin;
mod service;
mod tag;

pub use connection::{
    ConnectionConfig, ConnectionType, DEFAULT_DOCKER_PORT, DEFAULT_SSH_PORT, DockerEndpoint,
    KubernetesAccess, SshAuth, SshCredentials,
};
pub use error::{InfrastructureDomainError, ParseInfrastructureEnumError};
pub use health::{InstanceHealthSnapshot, InstanceStatus, ResourceSnapshot, SystemInfo};
pub use ids::{InstanceId, InstanceServiceId, PluginId, SpaceId};
pub use instance::{InfrastructureInstance, InstanceSpec, InstanceType, PersistedInstanceData};
pub use plugin::{AssignOutcome, ManagementPlugin, PluginCapabilities, PluginCompatibility};
pub use service::{
    DiscoveredService, InstanceService, PersistedServiceData, PluginBindingChange,
    ServiceEndpoint, ServiceOrigin, ServiceSpec, ServiceStatus, ServiceType,
};
pub use tag::canonical_tag;
