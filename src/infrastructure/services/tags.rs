//! Capability tag derivation from bound management plugins.

use super::{InfrastructureServiceError, InfrastructureServiceResult};
use crate::infrastructure::{
    domain::{InfrastructureInstance, InstanceId, InstanceService},
    ports::{InfrastructureStore, PluginCatalog},
};
use mockable::Clock;
use moka::future::Cache;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Derives, persists and caches instance tags.
///
/// An instance's tags are the canonical tags of the plugins bound to its
/// services. Cached entries expire after a short time to live and are
/// dropped whenever a binding changes or a sweep completes.
pub struct TagService<S, P, C>
where
    S: InfrastructureStore + ?Sized,
    P: PluginCatalog + ?Sized,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    catalog: Arc<P>,
    clock: Arc<C>,
    cache: Cache<InstanceId, Vec<String>>,
}

impl<S, P, C> TagService<S, P, C>
where
    S: InfrastructureStore + ?Sized,
    P: PluginCatalog + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a tag service whose cache holds up to `max_entries` instances
    /// for `ttl`.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        catalog: Arc<P>,
        clock: Arc<C>,
        ttl: Duration,
        max_entries: u64,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self {
            store,
            catalog,
            clock,
            cache,
        }
    }

    /// Returns the sorted, de-duplicated tags of an instance.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`] when the
    /// instance does not exist, or persistence errors.
    pub async fn tags(&self, instance_id: InstanceId) -> InfrastructureServiceResult<Vec<String>> {
        if let Some(cached) = self.cache.get(&instance_id).await {
            return Ok(cached);
        }
        let instance = self
            .store
            .find_instance(instance_id)
            .await?
            .ok_or(InfrastructureServiceError::InstanceNotFound(instance_id))?;
        let tags = self.derive(&instance).await?;
        if self
            .store
            .replace_tags(instance_id, &tags, self.clock.utc())
            .await?
        {
            debug!(instance_id = %instance_id, tags = ?tags, "persisted derived tags");
        }
        self.cache.insert(instance_id, tags.clone()).await;
        Ok(tags)
    }

    /// Drops the cached tags of an instance.
    pub async fn invalidate(&self, instance_id: InstanceId) {
        self.cache.invalidate(&instance_id).await;
    }

    /// Recomputes and persists the tags of an instance, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::tags`].
    pub async fn refresh(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureServiceResult<Vec<String>> {
        self.invalidate(instance_id).await;
        self.tags(instance_id).await
    }

    async fn derive(
        &self,
        instance: &InfrastructureInstance,
    ) -> InfrastructureServiceResult<Vec<String>> {
        let services = self.store.list_services(instance.id()).await?;
        let mut tags = BTreeSet::new();
        for service in &services {
            if let Some(tag) = self.plugin_tag(service).await {
                tags.insert(tag);
            }
        }
        Ok(tags.into_iter().collect())
    }

    async fn plugin_tag(&self, service: &InstanceService) -> Option<String> {
        let plugin_id = service.management_plugin_id()?;
        match self.catalog.find_plugin(plugin_id).await {
            Ok(Some(plugin)) => plugin.canonical_tag(),
            Ok(None) => {
                warn!(
                    service_id = %service.id(),
                    plugin_id = %plugin_id,
                    "bound plugin is not in the catalog; skipping its tag"
                );
                None
            }
            Err(err) => {
                warn!(
                    service_id = %service.id(),
                    plugin_id = %plugin_id,
                    error = %err,
                    "failed to resolve bound plugin; skipping its tag"
                );
                None
            }
        }
    }
}
