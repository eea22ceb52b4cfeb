//! Placeholder connector for Kubernetes clusters.

use crate::infrastructure::{
    domain::{ConnectionType, KubernetesAccess, SystemInfo},
    ports::{Connector, ConnectorError, ConnectorResult},
};
use async_trait::async_trait;

/// Kubernetes connector without a transport.
///
/// Registration works so clusters can be inventoried, but every active
/// operation reports that it is unsupported.
#[derive(Debug)]
pub struct KubernetesConnector {
    access: KubernetesAccess,
}

impl KubernetesConnector {
    /// Creates the placeholder connector.
    #[must_use]
    pub const fn new(access: KubernetesAccess) -> Self {
        Self { access }
    }

    /// Returns whether the cluster was registered with a kubeconfig.
    #[must_use]
    pub const fn has_kubeconfig(&self) -> bool {
        self.access.has_kubeconfig()
    }

    const fn unsupported(operation: &'static str) -> ConnectorError {
        ConnectorError::Unsupported {
            connection_type: ConnectionType::Kubernetes,
            operation,
        }
    }
}

#[async_trait]
impl Connector for KubernetesConnector {
    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Kubernetes
    }

    async fn connect(&self) -> ConnectorResult<()> {
        Err(Self::unsupported("connect"))
    }

    async fn check_health(&self) -> bool {
        false
    }

    async fn system_info(&self) -> ConnectorResult<SystemInfo> {
        Ok(SystemInfo::default())
    }

    async fn disconnect(&self) -> ConnectorResult<()> {
        Ok(())
    }
}
