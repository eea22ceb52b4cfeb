//! Error type shared by the infrastructure orchestration services.

use crate::infrastructure::{
    domain::{InfrastructureDomainError, InstanceId, InstanceServiceId, PluginId},
    ports::{ConnectorError, DiscoveryError, InfrastructureRepositoryError, MarketplaceError},
};
use std::time::Duration;
use thiserror::Error;

/// Service-level errors for infrastructure operations.
#[derive(Debug, Error)]
pub enum InfrastructureServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] InfrastructureDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] InfrastructureRepositoryError),
    /// Connector operation failed.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    /// Discovery could not run or failed part way.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// The marketplace could not resolve a plugin or component.
    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),
    /// No instance exists with the given identifier.
    #[error("infrastructure instance {0} not found")]
    InstanceNotFound(InstanceId),
    /// No service exists with the given identifier.
    #[error("instance service {0} not found")]
    ServiceNotFound(InstanceServiceId),
    /// The marketplace does not know the plugin.
    #[error("management plugin {0} not found")]
    PluginNotFound(PluginId),
    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Deadline that elapsed.
        after: Duration,
    },
}

impl InfrastructureServiceError {
    /// Returns whether the error means a referenced record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::InstanceNotFound(_)
                | Self::ServiceNotFound(_)
                | Self::PluginNotFound(_)
                | Self::Repository(
                    InfrastructureRepositoryError::InstanceNotFound(_)
                        | InfrastructureRepositoryError::ServiceNotFound(_)
                )
        )
    }
}

/// Result type for infrastructure service operations.
pub type InfrastructureServiceResult<T> = Result<T, InfrastructureServiceError>;
