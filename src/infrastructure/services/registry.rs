//! Registration and lookup of instances and their services.

use super::{InfrastructureServiceError, InfrastructureServiceResult, TagService};
use crate::infrastructure::{
    domain::{
        ConnectionConfig, InfrastructureInstance, InstanceId, InstanceService, InstanceServiceId,
        InstanceSpec, ServiceSpec,
    },
    ports::{InfrastructureStore, InstanceFilter, PluginCatalog},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Registry orchestration over the infrastructure store.
pub struct InstanceRegistryService<S, P, C>
where
    S: InfrastructureStore + ?Sized,
    P: PluginCatalog + ?Sized,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    tags: Arc<TagService<S, P, C>>,
    clock: Arc<C>,
}

impl<S, P, C> InstanceRegistryService<S, P, C>
where
    S: InfrastructureStore + ?Sized,
    P: PluginCatalog + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a registry service.
    #[must_use]
    pub const fn new(store: Arc<S>, tags: Arc<TagService<S, P, C>>, clock: Arc<C>) -> Self {
        Self { store, tags, clock }
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

    /// Registers a new instance with status `unknown` and no tags.
    ///
    /// # Errors
    ///
    /// Returns domain errors when the instance spec is invalid and
    /// repository errors when the name is taken or persistence fails.
    pub async fn register_instance(
        &self,
        spec: InstanceSpec,
    ) -> InfrastructureServiceResult<InfrastructureInstance> {
        let instance = InfrastructureInstance::new(spec, &*self.clock)?;
        self.store.insert_instance(&instance).await?;
        info!(
            instance_id = %instance.id(),
            name = instance.name(),
            connection_type = %instance.connection_type(),
            "registered infrastructure instance"
        );
        Ok(instance)
    }

    /// Finds an instance by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`] when no
    /// instance has the given ID, or persistence errors.
    pub async fn find_instance(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureServiceResult<InfrastructureInstance> {
        self.find_instance_or_error(instance_id).await
    }

    /// Lists instances matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns persistence errors from the repository.
    pub async fn list_instances(
        &self,
        filter: &InstanceFilter,
    ) -> InfrastructureServiceResult<Vec<InfrastructureInstance>> {
        Ok(self.store.list_instances(filter).await?)
    }

    /// Deletes an instance and every service it owns.
    ///
    /// # Errors
    ///
    /// Returns repository errors when the instance does not exist or
    /// persistence fails.
    pub async fn delete_instance(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureServiceResult<()> {
        self.store.delete_instance(instance_id).await?;
        self.tags.invalidate(instance_id).await;
        info!(instance_id = %instance_id, "deleted infrastructure instance");
        Ok(())
    }

    /// Replaces the connection configuration of an instance.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`], domain
    /// errors when the configuration does not suit the connection type, or
    /// persistence errors.
    pub async fn update_connection(
        &self,
        instance_id: InstanceId,
        connection_config: ConnectionConfig,
    ) -> InfrastructureServiceResult<InfrastructureInstance> {
        let mut instance = self.find_instance_or_error(instance_id).await?;
        instance.update_connection(connection_config, self.clock.utc())?;
        let updated = self
            .store
            .update_connection(instance_id, instance.connection_config(), instance.updated_at())
            .await?;
        info!(instance_id = %instance_id, "updated connection configuration");
        Ok(updated)
    }

    /// Adds a hand-declared service to an instance.
    ///
    /// Sweeps never remove or rewrite such services.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`], domain
    /// validation errors, or persistence errors.
    pub async fn add_service(
        &self,
        instance_id: InstanceId,
        spec: ServiceSpec,
    ) -> InfrastructureServiceResult<InstanceService> {
        self.find_instance_or_error(instance_id).await?;
        let service = InstanceService::manual(instance_id, spec, &*self.clock)?;
        self.store.insert_service(&service).await?;
        if service.management_plugin_id().is_some() {
            self.tags.refresh(instance_id).await?;
        }
        Ok(service)
    }

    /// Registers a service that is not attached to any instance.
    ///
    /// # Errors
    ///
    /// Returns domain validation errors or persistence errors.
    pub async fn register_remote_service(
        &self,
        spec: ServiceSpec,
    ) -> InfrastructureServiceResult<InstanceService> {
        let service = InstanceService::remote(spec, &*self.clock)?;
        self.store.insert_service(&service).await?;
        info!(service_id = %service.id(), name = service.name(), "registered remote service");
        Ok(service)
    }

    /// Lists the services of an instance.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`] when no
    /// instance has the given ID, or persistence errors.
    pub async fn list_services(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureServiceResult<Vec<InstanceService>> {
        self.find_instance_or_error(instance_id).await?;
        Ok(self.store.list_services(instance_id).await?)
    }

    /// Finds a service by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::ServiceNotFound`] when no
    /// service has the given ID, or persistence errors.
    pub async fn find_service(
        &self,
        service_id: InstanceServiceId,
    ) -> InfrastructureServiceResult<InstanceService> {
        self.store
            .find_service(service_id)
            .await?
            .ok_or(InfrastructureServiceError::ServiceNotFound(service_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{
        adapters::memory::{InMemoryInfrastructureStore, InMemoryPluginCatalog},
        domain::{ConnectionType, InstanceStatus, InstanceType, ServiceOrigin, ServiceType},
        ports::InfrastructureRepositoryError,
    };
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use std::time::Duration;

    type TestRegistry =
        InstanceRegistryService<InMemoryInfrastructureStore, InMemoryPluginCatalog, DefaultClock>;

    #[fixture]
    fn registry() -> TestRegistry {
        let store = Arc::new(InMemoryInfrastructureStore::new());
        let clock = Arc::new(DefaultClock);
        let tags = Arc::new(TagService::new(
            Arc::clone(&store),
            Arc::new(InMemoryPluginCatalog::default()),
            Arc::clone(&clock),
            Duration::from_secs(30),
            64,
        ));
        InstanceRegistryService::new(store, tags, clock)
    }

    fn docker_spec(name: &str) -> InstanceSpec {
        InstanceSpec {
            name: name.to_owned(),
            instance_type: InstanceType::DockerHost,
            host: "docker.internal".to_owned(),
            port: Some(2375),
            protocol: None,
            description: None,
            connection_type: ConnectionType::DockerApi,
            connection_config: ConnectionConfig::from_value(json!({})).expect("valid config"),
            space_id: None,
            created_by: Some("ops".to_owned()),
        }
    }

    fn service_spec(name: &str) -> ServiceSpec {
        ServiceSpec {
            name: name.to_owned(),
            service_type: ServiceType::Application,
            service_config: json!({}),
            endpoints: Vec::new(),
            health_check_url: None,
            management_plugin_id: None,
            space_id: None,
        }
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn registered_instance_starts_unknown_and_untagged(registry: TestRegistry) {
        let instance = registry
            .register_instance(docker_spec("builder"))
            .await
            .expect("registration should succeed");

        let found = registry
            .find_instance(instance.id())
            .await
            .expect("lookup should succeed");

        assert_eq!(found.status(), InstanceStatus::Unknown);
        assert!(found.tags().is_empty());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_names_are_rejected(registry: TestRegistry) {
        registry
            .register_instance(docker_spec("builder"))
            .await
            .expect("first registration should succeed");

        let result = registry.register_instance(docker_spec("builder")).await;

        assert!(matches!(
            result,
            Err(InfrastructureServiceError::Repository(
                InfrastructureRepositoryError::DuplicateInstanceName(_)
            ))
        ));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn listing_services_of_unknown_instance_is_not_found(registry: TestRegistry) {
        let result = registry.list_services(InstanceId::new()).await;

        assert!(matches!(
            result,
            Err(InfrastructureServiceError::InstanceNotFound(_))
        ));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn manual_and_remote_services_keep_their_origin(registry: TestRegistry) {
        let instance = registry
            .register_instance(docker_spec("builder"))
            .await
            .expect("registration should succeed");

        let manual = registry
            .add_service(instance.id(), service_spec("reporting"))
            .await
            .expect("manual service should be added");
        let remote = registry
            .register_remote_service(service_spec("saas-crm"))
            .await
            .expect("remote service should be registered");

        assert_eq!(manual.origin(), ServiceOrigin::Manual);
        assert_eq!(remote.origin(), ServiceOrigin::Remote);
        assert_eq!(remote.instance_id(), None);
        let listed = registry
            .list_services(instance.id())
            .await
            .expect("listing should succeed");
        assert_eq!(listed, vec![manual]);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn update_connection_revalidates(registry: TestRegistry) {
        let mut spec = docker_spec("shell-host");
        spec.connection_type = ConnectionType::Ssh;
        spec.connection_config =
            ConnectionConfig::from_value(json!({"username": "deploy"})).expect("valid config");
        let instance = registry
            .register_instance(spec)
            .await
            .expect("registration should succeed");

        let result = registry
            .update_connection(
                instance.id(),
                ConnectionConfig::from_value(json!({"password": "secret"})).expect("object"),
            )
            .await;

        assert!(matches!(result, Err(InfrastructureServiceError::Domain(_))));
    }
}
