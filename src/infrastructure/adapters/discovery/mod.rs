//! Service discoverers and the closed discoverer union.

mod docker;
mod systemd;

pub use docker::DockerDiscoverer;
pub use systemd::SystemdDiscoverer;

use crate::infrastructure::{
    domain::DiscoveredService,
    ports::{DiscoveryResult, ServiceDiscoverer},
};
use async_trait::async_trait;

/// Every discoverer the crate ships, selected by connection type.
#[derive(Debug, Clone)]
pub enum InstanceDiscoverer {
    /// Docker containers over the Engine API.
    Docker(DockerDiscoverer),
    /// systemd units over SSH.
    Systemd(SystemdDiscoverer),
}

#[async_trait]
impl ServiceDiscoverer for InstanceDiscoverer {
    async fn try_discover(&self) -> DiscoveryResult<Vec<DiscoveredService>> {
        match self {
            Self::Docker(discoverer) => discoverer.try_discover().await,
            Self::Systemd(discoverer) => discoverer.try_discover().await,
        }
    }
}
