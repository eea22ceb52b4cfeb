//! Health probing of registered instances.

use super::{InfrastructureServiceError, InfrastructureServiceResult};
use crate::infrastructure::{
    domain::{
        InfrastructureInstance, InstanceHealthSnapshot, InstanceId, InstanceStatus, SystemInfo,
    },
    ports::{Connector, ConnectorFactory, InfrastructureStore, InstanceFilter},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Failure to record the probe of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    /// Instance whose probe could not be recorded.
    pub instance_id: InstanceId,
    /// Reason.
    pub error: String,
}

/// Outcome of probing several instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Instances probed and recorded, as stored afterwards.
    pub probed: Vec<InfrastructureInstance>,
    /// Instances whose result could not be recorded.
    pub failures: Vec<ProbeFailure>,
}

impl ProbeReport {
    /// Counts recorded instances with the given status.
    #[must_use]
    pub fn count(&self, status: InstanceStatus) -> usize {
        self.probed
            .iter()
            .filter(|instance| instance.status() == status)
            .count()
    }
}

/// Probes instances and records their status, OS and resources.
///
/// `online` means the health check succeeded. `offline` means the connector
/// reported the instance unhealthy or the health check deadline elapsed.
/// `error` means no probe could be attempted for the instance's
/// configuration. System information is collected under its own deadline
/// and is simply left out when it is slow or unavailable.
pub struct HealthMonitor<S, F, C>
where
    S: InfrastructureStore + ?Sized,
    F: ConnectorFactory,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    factory: Arc<F>,
    clock: Arc<C>,
    probe_timeout: Duration,
}

impl<S, F, C> HealthMonitor<S, F, C>
where
    S: InfrastructureStore + ?Sized,
    F: ConnectorFactory,
    C: Clock + Send + Sync,
{
    /// Creates a monitor whose health checks and system information reads
    /// are each bounded by `probe_timeout`.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        factory: Arc<F>,
        clock: Arc<C>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            store,
            factory,
            clock,
            probe_timeout,
        }
    }

    /// Probes one instance and persists the result.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureServiceError::InstanceNotFound`] or
    /// persistence errors. Connector failures are recorded, not returned.
    pub async fn probe(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureServiceResult<InfrastructureInstance> {
        let instance = self
            .store
            .find_instance(instance_id)
            .await?
            .ok_or(InfrastructureServiceError::InstanceNotFound(instance_id))?;
        self.probe_instance(instance).await
    }

    /// Probes every instance matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns persistence errors when the instances cannot be listed.
    pub async fn probe_all(
        &self,
        filter: &InstanceFilter,
    ) -> InfrastructureServiceResult<ProbeReport> {
        let instances = self.store.list_instances(filter).await?;
        let mut report = ProbeReport::default();
        for instance in instances {
            let instance_id = instance.id();
            match self.probe_instance(instance).await {
                Ok(recorded) => report.probed.push(recorded),
                Err(err) => {
                    warn!(
                        instance_id = %instance_id,
                        error = %err,
                        "failed to record health probe"
                    );
                    report.failures.push(ProbeFailure {
                        instance_id,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Probes every instance each `interval` until `shutdown` turns `true`
    /// or its sender is dropped.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = interval.as_secs(), "health monitor started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.probe_all(&InstanceFilter::default()).await {
                        Ok(report) => debug!(
                            online = report.count(InstanceStatus::Online),
                            offline = report.count(InstanceStatus::Offline),
                            error = report.count(InstanceStatus::Error),
                            failures = report.failures.len(),
                            "health sweep complete"
                        ),
                        Err(err) => warn!(error = %err, "health sweep could not list instances"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("health monitor stopped");
    }

    async fn probe_instance(
        &self,
        instance: InfrastructureInstance,
    ) -> InfrastructureServiceResult<InfrastructureInstance> {
        let snapshot = self.assess(&instance).await;
        debug!(
            instance_id = %instance.id(),
            status = %snapshot.status(),
            "health probe finished"
        );
        Ok(self.store.record_health(instance.id(), &snapshot).await?)
    }

    async fn assess(&self, instance: &InfrastructureInstance) -> InstanceHealthSnapshot {
        let connector = match self.factory.connector_for(instance) {
            Ok(connector) => connector,
            Err(err) => {
                warn!(
                    instance_id = %instance.id(),
                    error = %err,
                    "cannot build connector for probe"
                );
                return InstanceHealthSnapshot::new(InstanceStatus::Error, self.clock.utc())
                    .with_message(err.to_string());
            }
        };
        match tokio::time::timeout(self.probe_timeout, connector.check_health()).await {
            Ok(true) => {}
            Ok(false) => {
                return InstanceHealthSnapshot::new(InstanceStatus::Offline, self.clock.utc())
                    .with_message("health check failed");
            }
            Err(_) => {
                return InstanceHealthSnapshot::new(InstanceStatus::Offline, self.clock.utc())
                    .with_message(format!(
                        "health check timed out after {}ms",
                        self.probe_timeout.as_millis()
                    ));
            }
        }

        let snapshot = InstanceHealthSnapshot::new(InstanceStatus::Online, self.clock.utc());
        match self.system_info(instance.id(), &connector).await {
            Some(info) if !info.is_empty() => snapshot.with_system_info(info),
            _ => snapshot,
        }
    }

    async fn system_info(
        &self,
        instance_id: InstanceId,
        connector: &impl Connector,
    ) -> Option<SystemInfo> {
        match tokio::time::timeout(self.probe_timeout, connector.system_info()).await {
            Ok(Ok(info)) => Some(info),
            Ok(Err(err)) => {
                debug!(instance_id = %instance_id, error = %err, "system information unavailable");
                None
            }
            Err(_) => {
                debug!(instance_id = %instance_id, "system information timed out");
                None
            }
        }
    }
}
