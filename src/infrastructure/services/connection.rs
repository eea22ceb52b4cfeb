//! Explicit connectivity actions against registered instances.

use super::{InfrastructureServiceError, InfrastructureServiceResult};
use crate::infrastructure::{
    domain::{InfrastructureInstance, InstanceId},
    ports::{Connector, ConnectorFactory, InfrastructureStore},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Runs user-initiated connector operations. Failures propagate.
pub struct ConnectionService<S, F>
where
    S: InfrastructureStore + ?Sized,
    F: ConnectorFactory,
{
    store: Arc<S>,
    factory: Arc<F>,
}

impl<S, F> ConnectionService<S, F>
where
    S: InfrastructureStore + ?Sized,
    F: ConnectorFactory,
{
    /// Creates a connection service.
    #[must_use]
    pub const fn new(store: Arc<S>, factory: Arc<F>) -> Self {
        Self { store, factory }
    }

    async fn find_instance_or_error(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureServiceResult<InfrastructureInstance> {
        self.store
            .find_instance(instance_id)
            .await?
            .ok_or(InfrastructureServiceError::InstanceNotFound(instance_id))
    }

    /// Connects to an instance and disconnects again.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`] or the
    /// connector error that prevented the connection.
    pub async fn test_connection(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureServiceResult<()> {
        let instance = self.find_instance_or_error(instance_id).await?;
        let connector = self.factory.connector_for(&instance)?;
        connector.connect().await?;
        if let Err(err) = connector.disconnect().await {
            debug!(
                instance_id = %instance_id,
                error = %err,
                "disconnect after connection test failed"
            );
        }
        info!(instance_id = %instance_id, "connection test succeeded");
        Ok(())
    }

    /// Runs a shell command on an instance and returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`], or connector
    /// errors such as an unsupported transport or a failing command.
    pub async fn execute(
        &self,
        instance_id: InstanceId,
        command: &str,
    ) -> InfrastructureServiceResult<String> {
        let instance = self.find_instance_or_error(instance_id).await?;
        let connector = self.factory.connector_for(&instance)?;
        debug!(instance_id = %instance_id, command, "executing remote command");
        Ok(connector.execute_command(command).await?)
    }
}
