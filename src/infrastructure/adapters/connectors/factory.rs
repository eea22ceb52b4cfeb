//! Connection-type dispatch for connectors and discoverers.

use super::{
    DockerApiClient, DockerApiConnector, InstanceConnector, KubernetesConnector, SshConnector,
};
use crate::infrastructure::{
    adapters::discovery::{DockerDiscoverer, InstanceDiscoverer, SystemdDiscoverer},
    domain::{ConnectionType, DEFAULT_SSH_PORT, InfrastructureInstance},
    ports::{
        ConnectorError, ConnectorFactory, ConnectorResult, DiscoveryError, DiscoveryResult,
        SshClient, SshTarget,
    },
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builds connectors over real transports.
#[derive(Clone)]
pub struct TransportConnectorFactory {
    ssh_client: Arc<dyn SshClient>,
    http: reqwest::Client,
    docker_timeout: Duration,
}

impl std::fmt::Debug for TransportConnectorFactory {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TransportConnectorFactory")
            .field("docker_timeout", &self.docker_timeout)
            .finish_non_exhaustive()
    }
}

impl TransportConnectorFactory {
    /// Creates a factory.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Connection`] when the HTTP client cannot be
    /// initialized.
    pub fn new(ssh_client: Arc<dyn SshClient>, docker_timeout: Duration) -> ConnectorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(docker_timeout)
            .build()
            .map_err(ConnectorError::connection)?;
        Ok(Self {
            ssh_client,
            http,
            docker_timeout,
        })
    }

    fn ssh_connector(&self, instance: &InfrastructureInstance) -> ConnectorResult<SshConnector> {
        let credentials = instance.connection_config().ssh_credentials()?;
        let target = SshTarget::new(
            instance.host(),
            instance.port().unwrap_or(DEFAULT_SSH_PORT),
            credentials,
        );
        Ok(SshConnector::new(Arc::clone(&self.ssh_client), target))
    }

    fn docker_client(&self, instance: &InfrastructureInstance) -> ConnectorResult<DockerApiClient> {
        let endpoint = instance.connection_config().docker_endpoint(
            instance.host(),
            instance.port(),
            instance.protocol(),
        )?;
        Ok(DockerApiClient::new(
            endpoint,
            self.http.clone(),
            self.docker_timeout,
        ))
    }
}

impl ConnectorFactory for TransportConnectorFactory {
    type Connector = InstanceConnector;
    type Discoverer = InstanceDiscoverer;

    fn connector_for(
        &self,
        instance: &InfrastructureInstance,
    ) -> ConnectorResult<InstanceConnector> {
        match instance.connection_type() {
            ConnectionType::Ssh => self.ssh_connector(instance).map(InstanceConnector::Ssh),
            ConnectionType::DockerApi => self
                .docker_client(instance)
                .map(|client| InstanceConnector::DockerApi(DockerApiConnector::new(client))),
            ConnectionType::Kubernetes => {
                let access = instance.connection_config().kubernetes_access()?;
                let connector = KubernetesConnector::new(access);
                debug!(
                    instance_id = %instance.id(),
                    has_kubeconfig = connector.has_kubeconfig(),
                    "built kubernetes placeholder connector"
                );
                Ok(InstanceConnector::Kubernetes(connector))
            }
            unsupported @ ConnectionType::Http => {
                Err(ConnectorError::UnsupportedConnectionType(unsupported))
            }
        }
    }

    fn discoverer_for(
        &self,
        instance: &InfrastructureInstance,
    ) -> DiscoveryResult<InstanceDiscoverer> {
        match instance.connection_type() {
            ConnectionType::Ssh => Ok(InstanceDiscoverer::Systemd(SystemdDiscoverer::new(
                self.ssh_connector(instance)?,
            ))),
            ConnectionType::DockerApi => Ok(InstanceDiscoverer::Docker(DockerDiscoverer::new(
                self.docker_client(instance)?,
            ))),
            unsupported @ (ConnectionType::Kubernetes | ConnectionType::Http) => {
                Err(DiscoveryError::Unsupported(unsupported))
            }
        }
    }
}
