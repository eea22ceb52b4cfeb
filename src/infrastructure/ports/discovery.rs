//! Service discovery port.

use super::ConnectorError;
use crate::infrastructure::domain::{ConnectionType, DiscoveredService};
use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Enumerates the services running on one instance.
///
/// Discoverers are instance-agnostic: results carry no instance identifier
/// and the caller attaches the owner.
#[async_trait]
pub trait ServiceDiscoverer: Send + Sync {
    /// Enumerates services, reporting fatal transport failures.
    ///
    /// Failures that concern a single service are folded into that service's
    /// status instead of failing the sweep.
    async fn try_discover(&self) -> DiscoveryResult<Vec<DiscoveredService>>;

    /// Enumerates services, returning an empty list on any fatal failure.
    async fn discover_services(&self) -> Vec<DiscoveredService> {
        match self.try_discover().await {
            Ok(services) => services,
            Err(err) => {
                warn!(error = %err, "service discovery failed");
                Vec::new()
            }
        }
    }
}

/// Errors returned by service discoverers.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// The underlying connector failed.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// No discoverer exists for the connection type.
    #[error("service discovery is not supported for {0} connections")]
    Unsupported(ConnectionType),
}
