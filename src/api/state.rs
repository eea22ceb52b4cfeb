//! Shared service graph behind the REST facade.

use crate::config::FleetConfig;
use crate::infrastructure::{
    adapters::connectors::TransportConnectorFactory,
    ports::{ComponentLoader, InfrastructureStore, PluginCatalog},
    services::{
        BindingService, ConnectionService, DiscoveryService, HealthMonitor,
        InstanceRegistryService, TagService,
    },
};
use mockable::DefaultClock;
use std::sync::Arc;
use std::time::Duration;

type Store = dyn InfrastructureStore;
type Catalog = dyn PluginCatalog;
type Loader = dyn ComponentLoader;

/// Registry service as wired by the daemon.
pub type FleetRegistry = InstanceRegistryService<Store, Catalog, DefaultClock>;
/// Connection service as wired by the daemon.
pub type FleetConnections = ConnectionService<Store, TransportConnectorFactory>;
/// Discovery service as wired by the daemon.
pub type FleetDiscovery = DiscoveryService<Store, TransportConnectorFactory, Catalog, DefaultClock>;
/// Health monitor as wired by the daemon.
pub type FleetHealth = HealthMonitor<Store, TransportConnectorFactory, DefaultClock>;
/// Tag service as wired by the daemon.
pub type FleetTags = TagService<Store, Catalog, DefaultClock>;
/// Binding service as wired by the daemon.
pub type FleetBindings = BindingService<Store, Catalog, Loader, DefaultClock>;

/// Timeouts and cache sizing for the service graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Deadline for one discovery sweep.
    pub sweep_timeout: Duration,
    /// Deadline for one health probe.
    pub probe_timeout: Duration,
    /// Tag cache time to live.
    pub tag_ttl: Duration,
    /// Tag cache capacity.
    pub tag_capacity: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&FleetConfig::default())
    }
}

impl From<&FleetConfig> for ServiceSettings {
    fn from(config: &FleetConfig) -> Self {
        Self {
            sweep_timeout: config.discovery.sweep_timeout(),
            probe_timeout: config.health.probe_timeout(),
            tag_ttl: config.tags.cache_ttl(),
            tag_capacity: config.tags.cache_capacity,
        }
    }
}

/// Services shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Instance and service registry.
    pub registry: Arc<FleetRegistry>,
    /// Explicit connector actions.
    pub connections: Arc<FleetConnections>,
    /// Discovery sweeps.
    pub discovery: Arc<FleetDiscovery>,
    /// Health probing.
    pub health: Arc<FleetHealth>,
    /// Tag derivation.
    pub tags: Arc<FleetTags>,
    /// Plugin bindings.
    pub bindings: Arc<FleetBindings>,
}

impl ApiState {
    /// Wires the service graph over the given adapters.
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        factory: Arc<TransportConnectorFactory>,
        catalog: Arc<Catalog>,
        loader: Arc<Loader>,
        settings: ServiceSettings,
    ) -> Self {
        let clock = Arc::new(DefaultClock);
        let tags = Arc::new(TagService::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&clock),
            settings.tag_ttl,
            settings.tag_capacity,
        ));
        Self {
            registry: Arc::new(InstanceRegistryService::new(
                Arc::clone(&store),
                Arc::clone(&tags),
                Arc::clone(&clock),
            )),
            connections: Arc::new(ConnectionService::new(
                Arc::clone(&store),
                Arc::clone(&factory),
            )),
            discovery: Arc::new(DiscoveryService::new(
                Arc::clone(&store),
                Arc::clone(&factory),
                Arc::clone(&tags),
                Arc::clone(&clock),
                settings.sweep_timeout,
            )),
            health: Arc::new(HealthMonitor::new(
                Arc::clone(&store),
                factory,
                Arc::clone(&clock),
                settings.probe_timeout,
            )),
            bindings: Arc::new(BindingService::new(
                store,
                catalog,
                loader,
                Arc::clone(&tags),
                clock,
            )),
            tags,
        }
    }
}
