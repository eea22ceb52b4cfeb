//! Discovery sweeps: enumerate, normalize and apply an instance's services.

use super::{InfrastructureServiceError, InfrastructureServiceResult, TagService};
use crate::infrastructure::{
    domain::{DiscoveredService, InfrastructureInstance, InstanceId, InstanceService},
    ports::{
        ConnectorFactory, InfrastructureStore, InstanceFilter, PluginCatalog, ServiceDiscoverer,
    },
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of sweeping several instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Instances swept successfully, with the number of services seen.
    pub swept: Vec<(InstanceId, usize)>,
    /// Instances whose sweep failed, with the reason.
    pub failed: Vec<(InstanceId, String)>,
}

/// Orchestrates discovery sweeps.
///
/// A completed sweep is authoritative for its instance. A failed sweep
/// leaves the stored services untouched.
pub struct DiscoveryService<S, F, P, C>
where
    S: InfrastructureStore + ?Sized,
    F: ConnectorFactory,
    P: PluginCatalog + ?Sized,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    factory: Arc<F>,
    tags: Arc<TagService<S, P, C>>,
    clock: Arc<C>,
    sweep_timeout: Duration,
}

impl<S, F, P, C> DiscoveryService<S, F, P, C>
where
    S: InfrastructureStore + ?Sized,
    F: ConnectorFactory,
    P: PluginCatalog + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a discovery service whose sweeps are bounded by
    /// `sweep_timeout`.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        factory: Arc<F>,
        tags: Arc<TagService<S, P, C>>,
        clock: Arc<C>,
        sweep_timeout: Duration,
    ) -> Self {
        Self {
            store,
            factory,
            tags,
            clock,
            sweep_timeout,
        }
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

    /// Sweeps one instance and returns its full service list afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`], discovery
    /// errors when the transport cannot enumerate services,
    /// [`InfrastructureServiceError::Timeout`] when the sweep overruns, or
    /// persistence errors.
    pub async fn discover(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureServiceResult<Vec<InstanceService>> {
        let instance = self.find_instance_or_error(instance_id).await?;
        let discoverer = self.factory.discoverer_for(&instance)?;
        let discovered = tokio::time::timeout(self.sweep_timeout, discoverer.try_discover())
            .await
            .map_err(|_| InfrastructureServiceError::Timeout {
                operation: "discovery sweep",
                after: self.sweep_timeout,
            })??;

        let existing = self.store.list_services(instance_id).await?;
        let merged = self.merge(instance_id, &existing, discovered);
        self.store.replace_discovered(instance_id, &merged).await?;
        info!(
            instance_id = %instance_id,
            discovered = merged.len(),
            "applied discovery sweep"
        );

        if let Err(err) = self.tags.refresh(instance_id).await {
            warn!(instance_id = %instance_id, error = %err, "tag refresh after sweep failed");
        }
        Ok(self.store.list_services(instance_id).await?)
    }

    /// Sweeps every instance matching `filter`, isolating failures.
    ///
    /// # Errors
    ///
    /// Returns persistence errors when the instances cannot be listed.
    pub async fn discover_all(
        &self,
        filter: &InstanceFilter,
    ) -> InfrastructureServiceResult<SweepReport> {
        let instances = self.store.list_instances(filter).await?;
        let mut report = SweepReport::default();
        for instance in instances {
            match self.discover(instance.id()).await {
                Ok(services) => report.swept.push((instance.id(), services.len())),
                Err(err) => {
                    warn!(instance_id = %instance.id(), error = %err, "discovery sweep failed");
                    report.failed.push((instance.id(), err.to_string()));
                }
            }
        }
        Ok(report)
    }

    fn merge(
        &self,
        instance_id: InstanceId,
        existing: &[InstanceService],
        discovered: Vec<DiscoveredService>,
    ) -> Vec<InstanceService> {
        let mut merged: Vec<InstanceService> = Vec::with_capacity(discovered.len());
        for item in discovered {
            if merged.iter().any(|seen| seen.matches_discovery(&item)) {
                debug!(
                    instance_id = %instance_id,
                    name = %item.name,
                    "ignoring repeated service in sweep"
                );
                continue;
            }
            let service = match existing.iter().find(|stored| stored.matches_discovery(&item)) {
                Some(stored) => {
                    let mut refreshed = stored.clone();
                    refreshed.refresh_from_discovery(item, &*self.clock);
                    refreshed
                }
                None => match InstanceService::from_discovery(instance_id, item, &*self.clock) {
                    Ok(created) => created,
                    Err(err) => {
                        warn!(
                            instance_id = %instance_id,
                            error = %err,
                            "skipping unusable discovery result"
                        );
                        continue;
                    }
                },
            };
            merged.push(service);
        }
        merged
    }
}
