//! Repository ports for instance and service persistence.

use crate::infrastructure::domain::{
    ConnectionConfig, InfrastructureInstance, InstanceHealthSnapshot, InstanceId,
    InstanceService, InstanceServiceId, InstanceStatus, InstanceType, PluginBindingChange,
    PluginId, SpaceId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type for infrastructure repository operations.
pub type InfrastructureRepositoryResult<T> = Result<T, InfrastructureRepositoryError>;

/// Criteria for listing instances. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    /// Restrict to one tenant scope.
    pub space_id: Option<SpaceId>,
    /// Restrict to one instance type.
    pub instance_type: Option<InstanceType>,
    /// Restrict to one status.
    pub status: Option<InstanceStatus>,
    /// Restrict to instances carrying a capability tag.
    pub tag: Option<String>,
}

impl InstanceFilter {
    /// Returns whether `instance` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, instance: &InfrastructureInstance) -> bool {
        self.space_id
            .as_ref()
            .is_none_or(|space| instance.space_id() == Some(space))
            && self
                .instance_type
                .is_none_or(|kind| instance.instance_type() == kind)
            && self.status.is_none_or(|status| instance.status() == status)
            && self.tag.as_deref().is_none_or(|tag| instance.has_tag(tag))
    }
}

/// Persistence contract for infrastructure instances.
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Stores a new instance.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::DuplicateInstance`] when the
    /// identifier exists or [`InfrastructureRepositoryError::DuplicateInstanceName`]
    /// when the name is taken within the same space.
    async fn insert_instance(
        &self,
        instance: &InfrastructureInstance,
    ) -> InfrastructureRepositoryResult<()>;

    /// Replaces the connection configuration of an instance.
    ///
    /// Only the configuration and `updated_at` are written.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::InstanceNotFound`] when the
    /// instance does not exist.
    async fn update_connection(
        &self,
        instance_id: InstanceId,
        connection_config: &ConnectionConfig,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<InfrastructureInstance>;

    /// Records a health probe result.
    ///
    /// Only status, health, OS and resource fields are written; OS and
    /// resource values absent from the snapshot keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::InstanceNotFound`] when the
    /// instance does not exist.
    async fn record_health(
        &self,
        instance_id: InstanceId,
        snapshot: &InstanceHealthSnapshot,
    ) -> InfrastructureRepositoryResult<InfrastructureInstance>;

    /// Replaces the derived tags of an instance, returning whether they
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::InstanceNotFound`] when the
    /// instance does not exist.
    async fn replace_tags(
        &self,
        instance_id: InstanceId,
        tags: &[String],
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<bool>;

    /// Finds an instance by identifier.
    async fn find_instance(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<Option<InfrastructureInstance>>;

    /// Lists instances matching a filter, ordered by creation time.
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
    ) -> InfrastructureRepositoryResult<Vec<InfrastructureInstance>>;

    /// Deletes an instance together with its services.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::InstanceNotFound`] when the
    /// instance does not exist.
    async fn delete_instance(&self, instance_id: InstanceId)
    -> InfrastructureRepositoryResult<()>;
}

/// Persistence contract for instance services.
#[async_trait]
pub trait InstanceServiceRepository: Send + Sync {
    /// Stores a new service.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::DuplicateService`] when the
    /// identifier exists or [`InfrastructureRepositoryError::InstanceNotFound`]
    /// when the owning instance does not exist.
    async fn insert_service(&self, service: &InstanceService) -> InfrastructureRepositoryResult<()>;

    /// Binds a management plugin to a service.
    ///
    /// Only the binding columns and `updated_at` are written. Binding the
    /// plugin already bound is [`PluginBindingChange::Unchanged`] and keeps
    /// the stored configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::ServiceNotFound`] when the
    /// service does not exist.
    async fn bind_plugin(
        &self,
        service_id: InstanceServiceId,
        plugin_id: &PluginId,
        management_config: Option<&Value>,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<PluginBindingChange>;

    /// Clears the plugin binding of a service, returning the plugin that was
    /// bound.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::ServiceNotFound`] when the
    /// service does not exist.
    async fn unbind_plugin(
        &self,
        service_id: InstanceServiceId,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<Option<PluginId>>;

    /// Finds a service by identifier.
    async fn find_service(
        &self,
        service_id: InstanceServiceId,
    ) -> InfrastructureRepositoryResult<Option<InstanceService>>;

    /// Lists the services of one instance, ordered by name.
    async fn list_services(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<Vec<InstanceService>>;

    /// Applies a completed discovery sweep atomically.
    ///
    /// `services` is the full discovered set for the instance. Services
    /// already stored get their runtime fields (status, configuration,
    /// endpoints, health check URL, `last_seen`) refreshed while their plugin
    /// binding is kept; new ones are inserted; stored `discovered`-origin
    /// services missing from the set are deleted. Manual and remote services
    /// are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureRepositoryError::InstanceNotFound`] when the
    /// instance was deleted before the sweep completed.
    async fn replace_discovered(
        &self,
        instance_id: InstanceId,
        services: &[InstanceService],
    ) -> InfrastructureRepositoryResult<()>;
}

/// Combined persistence contract used by the orchestration services.
pub trait InfrastructureStore: InstanceRepository + InstanceServiceRepository {}

impl<T> InfrastructureStore for T where
    T: InstanceRepository + InstanceServiceRepository + ?Sized
{
}

/// Errors returned by infrastructure repository implementations.
#[derive(Debug, Clone, Error)]
pub enum InfrastructureRepositoryError {
    /// An instance with the same identifier already exists.
    #[error("duplicate instance identifier: {0}")]
    DuplicateInstance(InstanceId),

    /// An instance with the same name already exists in the space.
    #[error("an instance named '{0}' already exists")]
    DuplicateInstanceName(String),

    /// The instance was not found.
    #[error("instance not found: {0}")]
    InstanceNotFound(InstanceId),

    /// A service with the same identifier already exists.
    #[error("duplicate service identifier: {0}")]
    DuplicateService(InstanceServiceId),

    /// The service was not found.
    #[error("service not found: {0}")]
    ServiceNotFound(InstanceServiceId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted infrastructure data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl InfrastructureRepositoryError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
