//! Protocol-specific connectors and the closed connector union.

mod docker;
mod factory;
mod kubernetes;
mod russh_client;
mod ssh;

pub use docker::{DockerApiClient, DockerApiConnector};
pub use factory::TransportConnectorFactory;
pub use kubernetes::KubernetesConnector;
pub use russh_client::RusshClient;
pub use ssh::SshConnector;

use crate::infrastructure::{
    domain::{ConnectionType, SystemInfo},
    ports::{Connector, ConnectorResult},
};
use async_trait::async_trait;

/// Every connector the crate ships, selected by connection type.
#[derive(Debug)]
pub enum InstanceConnector {
    /// Remote shell over SSH.
    Ssh(SshConnector),
    /// Docker Engine API.
    DockerApi(DockerApiConnector),
    /// Kubernetes placeholder.
    Kubernetes(KubernetesConnector),
}

#[async_trait]
impl Connector for InstanceConnector {
    fn connection_type(&self) -> ConnectionType {
        match self {
            Self::Ssh(connector) => connector.connection_type(),
            Self::DockerApi(connector) => connector.connection_type(),
            Self::Kubernetes(connector) => connector.connection_type(),
        }
    }

    async fn connect(&self) -> ConnectorResult<()> {
        match self {
            Self::Ssh(connector) => connector.connect().await,
            Self::DockerApi(connector) => connector.connect().await,
            Self::Kubernetes(connector) => connector.connect().await,
        }
    }

    async fn check_health(&self) -> bool {
        match self {
            Self::Ssh(connector) => connector.check_health().await,
            Self::DockerApi(connector) => connector.check_health().await,
            Self::Kubernetes(connector) => connector.check_health().await,
        }
    }

    async fn system_info(&self) -> ConnectorResult<SystemInfo> {
        match self {
            Self::Ssh(connector) => connector.system_info().await,
            Self::DockerApi(connector) => connector.system_info().await,
            Self::Kubernetes(connector) => connector.system_info().await,
        }
    }

    async fn disconnect(&self) -> ConnectorResult<()> {
        match self {
            Self::Ssh(connector) => connector.disconnect().await,
            Self::DockerApi(connector) => connector.disconnect().await,
            Self::Kubernetes(connector) => connector.disconnect().await,
        }
    }

    async fn execute_command(&self, command: &str) -> ConnectorResult<String> {
        match self {
            Self::Ssh(connector) => connector.execute_command(command).await,
            Self::DockerApi(connector) => connector.execute_command(command).await,
            Self::Kubernetes(connector) => connector.execute_command(command).await,
        }
    }
}
