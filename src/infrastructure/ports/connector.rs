//! Connector port for reaching infrastructure instances.

use super::{DiscoveryResult, ServiceDiscoverer};
use crate::infrastructure::domain::{
    ConnectionType, InfrastructureDomainError, InfrastructureInstance, SystemInfo,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Protocol-specific access to one instance.
///
/// Explicit operations propagate failures; [`Connector::check_health`]
/// coerces every failure into `false`.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the transport this connector speaks.
    fn connection_type(&self) -> ConnectionType;

    /// Establishes (and verifies) connectivity.
    async fn connect(&self) -> ConnectorResult<()>;

    /// Probes the instance. Never fails.
    async fn check_health(&self) -> bool;

    /// Collects whatever system information the transport can provide.
    ///
    /// Fields the instance does not report are left unset.
    async fn system_info(&self) -> ConnectorResult<SystemInfo>;

    /// Releases any held transport resources.
    async fn disconnect(&self) -> ConnectorResult<()>;

    /// Runs a shell command and returns its standard output.
    ///
    /// # Errors
    ///
    /// Transports without a shell return [`ConnectorError::Unsupported`].
    async fn execute_command(&self, _command: &str) -> ConnectorResult<String> {
        Err(ConnectorError::Unsupported {
            connection_type: self.connection_type(),
            operation: "execute_command",
        })
    }
}

/// Builds connectors and discoverers for instances by connection type.
pub trait ConnectorFactory: Send + Sync {
    /// Connector produced by this factory.
    type Connector: Connector;

    /// Discoverer produced by this factory.
    type Discoverer: ServiceDiscoverer;

    /// Builds the connector matching the instance's connection type.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::UnsupportedConnectionType`] for transports
    /// without a connector and [`ConnectorError::InvalidConfig`] when the
    /// connection configuration cannot be interpreted.
    fn connector_for(&self, instance: &InfrastructureInstance) -> ConnectorResult<Self::Connector>;

    /// Builds the service discoverer matching the instance's connection type.
    ///
    /// # Errors
    ///
    /// Returns [`super::DiscoveryError::Unsupported`] for transports without
    /// a discoverer.
    fn discoverer_for(
        &self,
        instance: &InfrastructureInstance,
    ) -> DiscoveryResult<Self::Discoverer>;
}

/// Errors returned by connectors and their transports.
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// The transport could not be established or broke mid-operation.
    #[error("connection failed: {0}")]
    Connection(Arc<dyn std::error::Error + Send + Sync>),

    /// The remote end rejected the credentials.
    #[error("authentication rejected for user '{username}'")]
    Authentication {
        /// Login user that was rejected.
        username: String,
    },

    /// A remote command exited unsuccessfully.
    #[error("command '{command}' failed with exit status {exit_status}")]
    Command {
        /// Command that failed.
        command: String,
        /// Reported exit status.
        exit_status: u32,
    },

    /// The stored connection configuration is unusable.
    #[error("invalid connection config: {0}")]
    InvalidConfig(#[from] InfrastructureDomainError),

    /// The connector does not implement the operation.
    #[error("{operation} is not supported for {connection_type} connections")]
    Unsupported {
        /// Connector transport.
        connection_type: ConnectionType,
        /// Operation name.
        operation: &'static str,
    },

    /// No connector exists for the connection type.
    #[error("unsupported connection type: {0}")]
    UnsupportedConnectionType(ConnectionType),

    /// The remote end answered with something unexpected.
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// The operation exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ConnectorError {
    /// Wraps a transport failure.
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connection(Arc::new(err))
    }

    /// Builds a protocol error from a message.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}
