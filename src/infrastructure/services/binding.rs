//! Management plugin binding for services.

use super::{InfrastructureServiceError, InfrastructureServiceResult, TagService};
use crate::infrastructure::{
    domain::{
        AssignOutcome, InstanceService, InstanceServiceId, ManagementPlugin, PluginBindingChange,
        PluginCompatibility, PluginId,
    },
    ports::{ComponentLoader, InfrastructureStore, MountableComponent, PluginCatalog},
};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Binds marketplace plugins to services and resolves their components.
pub struct BindingService<S, P, L, C>
where
    S: InfrastructureStore + ?Sized,
    P: PluginCatalog + ?Sized,
    L: ComponentLoader + ?Sized,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    catalog: Arc<P>,
    loader: Arc<L>,
    tags: Arc<TagService<S, P, C>>,
    clock: Arc<C>,
}

impl<S, P, L, C> BindingService<S, P, L, C>
where
    S: InfrastructureStore + ?Sized,
    P: PluginCatalog + ?Sized,
    L: ComponentLoader + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a binding service.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        catalog: Arc<P>,
        loader: Arc<L>,
        tags: Arc<TagService<S, P, C>>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            store,
            catalog,
            loader,
            tags,
            clock,
        }
    }

    async fn find_service_or_error(
        &self,
        service_id: InstanceServiceId,
    ) -> InfrastructureServiceResult<InstanceService> {
        self.store
            .find_service(service_id)
            .await?
            .ok_or(InfrastructureServiceError::ServiceNotFound(service_id))
    }

    async fn find_plugin_or_error(
        &self,
        plugin_id: &PluginId,
    ) -> InfrastructureServiceResult<ManagementPlugin> {
        self.catalog
            .find_plugin(plugin_id)
            .await?
            .ok_or_else(|| InfrastructureServiceError::PluginNotFound(plugin_id.clone()))
    }

    async fn refresh_owner_tags(
        &self,
        service: &InstanceService,
    ) -> InfrastructureServiceResult<()> {
        if let Some(instance_id) = service.instance_id() {
            self.tags.refresh(instance_id).await?;
        }
        Ok(())
    }

    /// Binds `plugin_id` to a service.
    ///
    /// Compatibility with the plugin's declared service type is reported,
    /// not enforced. Binding the plugin already bound changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::ServiceNotFound`],
    /// [`InfrastructureServiceError::PluginNotFound`], or marketplace and
    /// persistence errors.
    pub async fn assign(
        &self,
        service_id: InstanceServiceId,
        plugin_id: PluginId,
        management_config: Option<Value>,
    ) -> InfrastructureServiceResult<AssignOutcome> {
        let service = self.find_service_or_error(service_id).await?;
        let plugin = self.find_plugin_or_error(&plugin_id).await?;
        let compatibility = plugin.compatibility_with(&service);
        if compatibility == PluginCompatibility::Mismatch {
            warn!(
                service_id = %service_id,
                plugin_id = %plugin_id,
                service_type = %service.service_type(),
                "plugin declares a different service type"
            );
        }

        let change = self
            .store
            .bind_plugin(
                service_id,
                &plugin_id,
                management_config.as_ref(),
                self.clock.utc(),
            )
            .await?;
        if change != PluginBindingChange::Unchanged {
            self.refresh_owner_tags(&service).await?;
            info!(service_id = %service_id, plugin_id = %plugin.id(), "bound management plugin");
        }
        Ok(AssignOutcome {
            change,
            compatibility,
        })
    }

    /// Clears the plugin binding of a service.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::ServiceNotFound`] or
    /// persistence errors.
    pub async fn unassign(
        &self,
        service_id: InstanceServiceId,
    ) -> InfrastructureServiceResult<Option<PluginId>> {
        let service = self.find_service_or_error(service_id).await?;
        let previous = self.store.unbind_plugin(service_id, self.clock.utc()).await?;
        if previous.is_some() {
            self.refresh_owner_tags(&service).await?;
            info!(service_id = %service_id, "removed management plugin binding");
        }
        Ok(previous)
    }

    /// Resolves the management component for a service.
    ///
    /// Services without a bound plugin return `None` and get the generic
    /// view.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::ServiceNotFound`],
    /// [`InfrastructureServiceError::PluginNotFound`] when the bound plugin
    /// was withdrawn, or loader errors.
    pub async fn load_component(
        &self,
        service_id: InstanceServiceId,
    ) -> InfrastructureServiceResult<Option<MountableComponent>> {
        let service = self.find_service_or_error(service_id).await?;
        let Some(plugin_id) = service.management_plugin_id() else {
            return Ok(None);
        };
        let plugin = self.find_plugin_or_error(plugin_id).await?;
        Ok(Some(self.loader.load(&plugin, &service).await?))
    }
}
