//! In-memory store for instances and their services.

use crate::infrastructure::{
    domain::{
        ConnectionConfig, InfrastructureInstance, InstanceHealthSnapshot, InstanceId,
        InstanceService, InstanceServiceId, PluginBindingChange, PluginId, ServiceOrigin,
    },
    ports::{
        InfrastructureRepositoryError, InfrastructureRepositoryResult, InstanceFilter,
        InstanceRepository, InstanceServiceRepository,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory infrastructure store.
///
/// One lock guards instances and services together, so cascade deletes and
/// sweep replacement are atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInfrastructureStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    instances: HashMap<InstanceId, InfrastructureInstance>,
    services: HashMap<InstanceServiceId, InstanceService>,
}

impl InMemoryStoreState {
    fn instance_mut(
        &mut self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<&mut InfrastructureInstance> {
        self.instances
            .get_mut(&instance_id)
            .ok_or(InfrastructureRepositoryError::InstanceNotFound(instance_id))
    }

    fn service_mut(
        &mut self,
        service_id: InstanceServiceId,
    ) -> InfrastructureRepositoryResult<&mut InstanceService> {
        self.services
            .get_mut(&service_id)
            .ok_or(InfrastructureRepositoryError::ServiceNotFound(service_id))
    }

    fn name_taken(&self, candidate: &InfrastructureInstance) -> bool {
        self.instances.values().any(|existing| {
            existing.id() != candidate.id()
                && existing.name() == candidate.name()
                && existing.space_id() == candidate.space_id()
        })
    }
}

impl InMemoryInfrastructureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> InfrastructureRepositoryResult<RwLockReadGuard<'_, InMemoryStoreState>> {
        self.state.read().map_err(|err| {
            InfrastructureRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> InfrastructureRepositoryResult<RwLockWriteGuard<'_, InMemoryStoreState>> {
        self.state.write().map_err(|err| {
            InfrastructureRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl InstanceRepository for InMemoryInfrastructureStore {
    async fn insert_instance(
        &self,
        instance: &InfrastructureInstance,
    ) -> InfrastructureRepositoryResult<()> {
        let mut state = self.write()?;
        if state.instances.contains_key(&instance.id()) {
            return Err(InfrastructureRepositoryError::DuplicateInstance(
                instance.id(),
            ));
        }
        if state.name_taken(instance) {
            return Err(InfrastructureRepositoryError::DuplicateInstanceName(
                instance.name().to_owned(),
            ));
        }
        state.instances.insert(instance.id(), instance.clone());
        Ok(())
    }

    async fn update_connection(
        &self,
        instance_id: InstanceId,
        connection_config: &ConnectionConfig,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<InfrastructureInstance> {
        let mut state = self.write()?;
        let stored = state.instance_mut(instance_id)?;
        stored.set_connection_config(connection_config.clone(), updated_at);
        Ok(stored.clone())
    }

    async fn record_health(
        &self,
        instance_id: InstanceId,
        snapshot: &InstanceHealthSnapshot,
    ) -> InfrastructureRepositoryResult<InfrastructureInstance> {
        let mut state = self.write()?;
        let stored = state.instance_mut(instance_id)?;
        stored.record_health(snapshot.clone());
        Ok(stored.clone())
    }

    async fn replace_tags(
        &self,
        instance_id: InstanceId,
        tags: &[String],
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<bool> {
        let mut state = self.write()?;
        Ok(state.instance_mut(instance_id)?.replace_tags(tags, updated_at))
    }

    async fn find_instance(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<Option<InfrastructureInstance>> {
        let state = self.read()?;
        Ok(state.instances.get(&instance_id).cloned())
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
    ) -> InfrastructureRepositoryResult<Vec<InfrastructureInstance>> {
        let state = self.read()?;
        let mut instances: Vec<_> = state
            .instances
            .values()
            .filter(|instance| filter.matches(instance))
            .cloned()
            .collect();
        instances.sort_by_key(|instance| (instance.created_at(), instance.id()));
        Ok(instances)
    }

    async fn delete_instance(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<()> {
        let mut state = self.write()?;
        if state.instances.remove(&instance_id).is_none() {
            return Err(InfrastructureRepositoryError::InstanceNotFound(instance_id));
        }
        state
            .services
            .retain(|_, service| service.instance_id() != Some(instance_id));
        Ok(())
    }
}

#[async_trait]
impl InstanceServiceRepository for InMemoryInfrastructureStore {
    async fn insert_service(
        &self,
        service: &InstanceService,
    ) -> InfrastructureRepositoryResult<()> {
        let mut state = self.write()?;
        if state.services.contains_key(&service.id()) {
            return Err(InfrastructureRepositoryError::DuplicateService(service.id()));
        }
        if let Some(owner) = service.instance_id()
            && !state.instances.contains_key(&owner)
        {
            return Err(InfrastructureRepositoryError::InstanceNotFound(owner));
        }
        state.services.insert(service.id(), service.clone());
        Ok(())
    }

    async fn bind_plugin(
        &self,
        service_id: InstanceServiceId,
        plugin_id: &PluginId,
        management_config: Option<&Value>,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<PluginBindingChange> {
        let mut state = self.write()?;
        let stored = state.service_mut(service_id)?;
        Ok(stored.assign_plugin(plugin_id.clone(), management_config.cloned(), updated_at))
    }

    async fn unbind_plugin(
        &self,
        service_id: InstanceServiceId,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<Option<PluginId>> {
        let mut state = self.write()?;
        Ok(state.service_mut(service_id)?.unassign_plugin(updated_at))
    }

    async fn find_service(
        &self,
        service_id: InstanceServiceId,
    ) -> InfrastructureRepositoryResult<Option<InstanceService>> {
        let state = self.read()?;
        Ok(state.services.get(&service_id).cloned())
    }

    async fn list_services(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<Vec<InstanceService>> {
        let state = self.read()?;
        let mut services: Vec<_> = state
            .services
            .values()
            .filter(|service| service.instance_id() == Some(instance_id))
            .cloned()
            .collect();
        services.sort_by(|left, right| {
            left.name()
                .cmp(right.name())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(services)
    }

    async fn replace_discovered(
        &self,
        instance_id: InstanceId,
        services: &[InstanceService],
    ) -> InfrastructureRepositoryResult<()> {
        let mut state = self.write()?;
        if !state.instances.contains_key(&instance_id) {
            return Err(InfrastructureRepositoryError::InstanceNotFound(instance_id));
        }

        let current: HashSet<InstanceServiceId> =
            services.iter().map(InstanceService::id).collect();
        state.services.retain(|id, stored| {
            stored.instance_id() != Some(instance_id)
                || stored.origin() != ServiceOrigin::Discovered
                || current.contains(id)
        });

        for service in services {
            match state.services.get_mut(&service.id()) {
                Some(stored) => stored.absorb_sighting(service),
                None => {
                    state.services.insert(service.id(), service.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::domain::{
        ConnectionType, DiscoveredService, InstanceSpec, InstanceStatus, InstanceType,
        ServiceStatus, ServiceType,
    };
    use mockable::{Clock, DefaultClock};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn instance() -> InfrastructureInstance {
        InfrastructureInstance::new(
            InstanceSpec {
                name: String::from("docker1"),
                instance_type: InstanceType::DockerHost,
                host: String::from("10.0.0.9"),
                port: Some(2375),
                protocol: None,
                description: None,
                connection_type: ConnectionType::DockerApi,
                connection_config: ConnectionConfig::default(),
                space_id: None,
                created_by: None,
            },
            &DefaultClock,
        )
        .expect("valid instance")
    }

    fn web(status: ServiceStatus) -> DiscoveredService {
        DiscoveredService {
            name: String::from("web"),
            service_type: ServiceType::DockerContainer,
            status,
            service_config: json!({ "image": "nginx:1.27" }),
            endpoints: Vec::new(),
            health_check_url: None,
        }
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn binding_keeps_fields_refreshed_by_a_sweep(instance: InfrastructureInstance) {
        let store = InMemoryInfrastructureStore::new();
        store.insert_instance(&instance).await.expect("insert instance");
        let service = InstanceService::from_discovery(
            instance.id(),
            web(ServiceStatus::Running),
            &DefaultClock,
        )
        .expect("valid service");
        store.insert_service(&service).await.expect("insert service");
        let mut sighting = service.clone();
        sighting.refresh_from_discovery(web(ServiceStatus::Stopped), &DefaultClock);
        store
            .replace_discovered(instance.id(), &[sighting])
            .await
            .expect("sweep should apply");

        let plugin = PluginId::new("nginx-manager").expect("valid plugin id");
        let change = store
            .bind_plugin(service.id(), &plugin, None, DefaultClock.utc())
            .await
            .expect("binding should apply");

        assert_eq!(change, PluginBindingChange::Assigned);
        let stored = store
            .find_service(service.id())
            .await
            .expect("lookup")
            .expect("service exists");
        assert_eq!(stored.status(), ServiceStatus::Stopped);
        assert_eq!(stored.management_plugin_id(), Some(&plugin));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn health_and_tags_are_written_independently(instance: InfrastructureInstance) {
        let store = InMemoryInfrastructureStore::new();
        store.insert_instance(&instance).await.expect("insert instance");
        let tags = [String::from("nginx")];

        assert!(
            store
                .replace_tags(instance.id(), &tags, DefaultClock.utc())
                .await
                .expect("tags should apply")
        );
        let probed = store
            .record_health(
                instance.id(),
                &InstanceHealthSnapshot::new(InstanceStatus::Online, DefaultClock.utc()),
            )
            .await
            .expect("health should apply");
        assert!(
            !store
                .replace_tags(instance.id(), &tags, DefaultClock.utc())
                .await
                .expect("tags should apply")
        );

        assert_eq!(probed.tags(), tags);
        let stored = store
            .find_instance(instance.id())
            .await
            .expect("lookup")
            .expect("instance exists");
        assert_eq!(stored.status(), InstanceStatus::Online);
        assert_eq!(stored.tags(), tags);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn narrow_writes_to_missing_records_are_not_found() {
        let store = InMemoryInfrastructureStore::new();

        let instance_result = store
            .update_connection(InstanceId::new(), &ConnectionConfig::default(), DefaultClock.utc())
            .await;
        let service_result = store
            .unbind_plugin(InstanceServiceId::new(), DefaultClock.utc())
            .await;

        assert!(matches!(
            instance_result,
            Err(InfrastructureRepositoryError::InstanceNotFound(_))
        ));
        assert!(matches!(
            service_result,
            Err(InfrastructureRepositoryError::ServiceNotFound(_))
        ));
    }
}
