//! Instance service entity, discovery snapshot and plugin binding state.

use super::{
    InfrastructureDomainError, InstanceId, InstanceServiceId, ParseInfrastructureEnumError,
    PluginId, SpaceId,
};
use super::error::{MAX_NAME_LENGTH, ensure_max_length};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of service running on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Docker container.
    DockerContainer,
    /// systemd unit.
    SystemdService,
    /// Application registered by hand.
    Application,
}

impl ServiceType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DockerContainer => "docker_container",
            Self::SystemdService => "systemd_service",
            Self::Application => "application",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceType {
    type Error = ParseInfrastructureEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "docker_container" => Ok(Self::DockerContainer),
            "systemd_service" => Ok(Self::SystemdService),
            "application" => Ok(Self::Application),
            _ => Err(ParseInfrastructureEnumError::new("service type", value)),
        }
    }
}

/// Runtime status of a service.
///
/// `Error` is reserved for discovery-layer fetch failures, not for the
/// service's own reported runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Service is running.
    Running,
    /// Service is not running.
    Stopped,
    /// Discovery could not fetch the service state.
    Error,
    /// State could not be determined.
    #[default]
    Unknown,
}

impl ServiceStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceStatus {
    type Error = ParseInfrastructureEnumError;

    fn try_from(value: &str) -> Result<Self, ParseInfrastructureEnumError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "running" => Ok(Self::Running),
            "stopped" => Ok(Self::Stopped),
            "error" => Ok(Self::Error),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseInfrastructureEnumError::new("service status", value)),
        }
    }
}

/// How a service record came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOrigin {
    /// Produced by a discovery sweep; owned by later sweeps.
    Discovered,
    /// Added by hand to an instance.
    Manual,
    /// Registered without an owning instance.
    Remote,
}

impl ServiceOrigin {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Manual => "manual",
            Self::Remote => "remote",
        }
    }
}

impl TryFrom<&str> for ServiceOrigin {
    type Error = ParseInfrastructureEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "discovered" => Ok(Self::Discovered),
            "manual" => Ok(Self::Manual),
            "remote" => Ok(Self::Remote),
            _ => Err(ParseInfrastructureEnumError::new("service origin", value)),
        }
    }
}

/// Network endpoint exposed by a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Host or URL the endpoint is reachable at.
    pub url: String,
    /// Port number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Transport protocol, e.g. `tcp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl ServiceEndpoint {
    /// Creates an endpoint with a validated URL.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::EmptyEndpointUrl`] when `url` is
    /// blank.
    pub fn new(
        url: impl Into<String>,
        port: Option<u16>,
        protocol: Option<String>,
    ) -> Result<Self, InfrastructureDomainError> {
        let normalized = url.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(InfrastructureDomainError::EmptyEndpointUrl);
        }
        Ok(Self {
            url: normalized,
            port,
            protocol,
        })
    }
}

/// Normalized result of enumerating one service during a discovery sweep.
///
/// Carries no instance identifier: the caller attaches the owning instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    /// Service name.
    pub name: String,
    /// Service kind.
    pub service_type: ServiceType,
    /// Status at discovery time.
    pub status: ServiceStatus,
    /// Connector-specific payload.
    pub service_config: Value,
    /// Exposed endpoints.
    pub endpoints: Vec<ServiceEndpoint>,
    /// Optional health check URL.
    pub health_check_url: Option<String>,
}

/// Outcome of binding a management plugin to a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginBindingChange {
    /// The same plugin was already bound; nothing changed.
    Unchanged,
    /// The service had no plugin before.
    Assigned,
    /// A different plugin was bound before and has been replaced.
    Replaced(PluginId),
}

/// Parameter object for services created outside discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Service name.
    pub name: String,
    /// Service kind.
    pub service_type: ServiceType,
    /// Free-form configuration.
    pub service_config: Value,
    /// Exposed endpoints.
    pub endpoints: Vec<ServiceEndpoint>,
    /// Optional health check URL.
    pub health_check_url: Option<String>,
    /// Plugin to bind on creation.
    pub management_plugin_id: Option<PluginId>,
    /// Tenant scope, used for remote services.
    pub space_id: Option<SpaceId>,
}

/// Parameter object for reconstructing persisted service state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedServiceData {
    /// Persisted identifier.
    pub id: InstanceServiceId,
    /// Persisted owning instance.
    pub instance_id: Option<InstanceId>,
    /// Persisted space scope.
    pub space_id: Option<SpaceId>,
    /// Persisted name.
    pub name: String,
    /// Persisted kind.
    pub service_type: ServiceType,
    /// Persisted origin.
    pub origin: ServiceOrigin,
    /// Persisted status.
    pub status: ServiceStatus,
    /// Persisted configuration payload.
    pub service_config: Value,
    /// Persisted endpoints.
    pub endpoints: Vec<ServiceEndpoint>,
    /// Persisted health check URL.
    pub health_check_url: Option<String>,
    /// Persisted plugin binding.
    pub management_plugin_id: Option<PluginId>,
    /// Persisted plugin configuration.
    pub management_config: Option<Value>,
    /// Persisted first discovery timestamp.
    pub discovered_at: DateTime<Utc>,
    /// Persisted last sighting timestamp.
    pub last_seen: DateTime<Utc>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Service running on, or bound to, an infrastructure instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceService {
    id: InstanceServiceId,
    instance_id: Option<InstanceId>,
    space_id: Option<SpaceId>,
    name: String,
    service_type: ServiceType,
    origin: ServiceOrigin,
    status: ServiceStatus,
    service_config: Value,
    endpoints: Vec<ServiceEndpoint>,
    health_check_url: Option<String>,
    management_plugin_id: Option<PluginId>,
    management_config: Option<Value>,
    discovered_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InstanceService {
    /// Creates a service record from its first discovery.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::EmptyServiceName`] when the
    /// discovered name is blank.
    pub fn from_discovery(
        instance_id: InstanceId,
        discovered: DiscoveredService,
        clock: &impl Clock,
    ) -> Result<Self, InfrastructureDomainError> {
        let name = validated_name(&discovered.name)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: InstanceServiceId::new(),
            instance_id: Some(instance_id),
            space_id: None,
            name,
            service_type: discovered.service_type,
            origin: ServiceOrigin::Discovered,
            status: discovered.status,
            service_config: discovered.service_config,
            endpoints: discovered.endpoints,
            health_check_url: discovered.health_check_url,
            management_plugin_id: None,
            management_config: None,
            discovered_at: timestamp,
            last_seen: timestamp,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Creates a service added by hand to an instance.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::EmptyServiceName`] when the name
    /// is blank.
    pub fn manual(
        instance_id: InstanceId,
        spec: ServiceSpec,
        clock: &impl Clock,
    ) -> Result<Self, InfrastructureDomainError> {
        Self::from_spec(Some(instance_id), ServiceOrigin::Manual, spec, clock)
    }

    /// Creates a service that has no owning instance.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::EmptyServiceName`] when the name
    /// is blank.
    pub fn remote(
        spec: ServiceSpec,
        clock: &impl Clock,
    ) -> Result<Self, InfrastructureDomainError> {
        Self::from_spec(None, ServiceOrigin::Remote, spec, clock)
    }

    fn from_spec(
        instance_id: Option<InstanceId>,
        origin: ServiceOrigin,
        spec: ServiceSpec,
        clock: &impl Clock,
    ) -> Result<Self, InfrastructureDomainError> {
        let name = validated_name(&spec.name)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: InstanceServiceId::new(),
            instance_id,
            space_id: spec.space_id,
            name,
            service_type: spec.service_type,
            origin,
            status: ServiceStatus::Unknown,
            service_config: spec.service_config,
            endpoints: spec.endpoints,
            health_check_url: spec.health_check_url,
            management_plugin_id: spec.management_plugin_id,
            management_config: None,
            discovered_at: timestamp,
            last_seen: timestamp,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a service from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedServiceData) -> Self {
        Self {
            id: data.id,
            instance_id: data.instance_id,
            space_id: data.space_id,
            name: data.name,
            service_type: data.service_type,
            origin: data.origin,
            status: data.status,
            service_config: data.service_config,
            endpoints: data.endpoints,
            health_check_url: data.health_check_url,
            management_plugin_id: data.management_plugin_id,
            management_config: data.management_config,
            discovered_at: data.discovered_at,
            last_seen: data.last_seen,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the service identifier.
    #[must_use]
    pub const fn id(&self) -> InstanceServiceId {
        self.id
    }

    /// Returns the owning instance, absent for remote services.
    #[must_use]
    pub const fn instance_id(&self) -> Option<InstanceId> {
        self.instance_id
    }

    /// Returns the tenant scope of a remote service.
    #[must_use]
    pub const fn space_id(&self) -> Option<&SpaceId> {
        self.space_id.as_ref()
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the service kind.
    #[must_use]
    pub const fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Returns how the record was created.
    #[must_use]
    pub const fn origin(&self) -> ServiceOrigin {
        self.origin
    }

    /// Returns the runtime status.
    #[must_use]
    pub const fn status(&self) -> ServiceStatus {
        self.status
    }

    /// Returns the connector-specific configuration payload.
    #[must_use]
    pub const fn service_config(&self) -> &Value {
        &self.service_config
    }

    /// Returns exposed endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &[ServiceEndpoint] {
        &self.endpoints
    }

    /// Returns the health check URL.
    #[must_use]
    pub fn health_check_url(&self) -> Option<&str> {
        self.health_check_url.as_deref()
    }

    /// Returns the bound management plugin.
    #[must_use]
    pub const fn management_plugin_id(&self) -> Option<&PluginId> {
        self.management_plugin_id.as_ref()
    }

    /// Returns the plugin-specific configuration.
    #[must_use]
    pub const fn management_config(&self) -> Option<&Value> {
        self.management_config.as_ref()
    }

    /// Returns when the service was first discovered.
    #[must_use]
    pub const fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }

    /// Returns when a sweep last saw the service.
    #[must_use]
    pub const fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether `discovered` describes the same service.
    ///
    /// Sweeps match by kind and name so that identity, first discovery time
    /// and plugin bindings survive container recreation.
    #[must_use]
    pub fn matches_discovery(&self, discovered: &DiscoveredService) -> bool {
        self.origin == ServiceOrigin::Discovered
            && self.service_type == discovered.service_type
            && self.name == discovered.name.trim()
    }

    /// Refreshes runtime fields from a later sweep.
    ///
    /// Identity, `discovered_at` and the plugin binding are preserved.
    pub fn refresh_from_discovery(&mut self, discovered: DiscoveredService, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.status = discovered.status;
        self.service_config = discovered.service_config;
        self.endpoints = discovered.endpoints;
        if discovered.health_check_url.is_some() {
            self.health_check_url = discovered.health_check_url;
        }
        self.last_seen = timestamp;
        self.updated_at = timestamp;
    }

    /// Copies the runtime fields of a later sighting of this service.
    ///
    /// Used by repositories applying a sweep: the stored plugin binding wins
    /// over whatever the sweep read before it started.
    pub(crate) fn absorb_sighting(&mut self, observed: &Self) {
        self.status = observed.status;
        self.service_config.clone_from(&observed.service_config);
        self.endpoints.clone_from(&observed.endpoints);
        self.health_check_url.clone_from(&observed.health_check_url);
        self.last_seen = observed.last_seen;
        self.updated_at = observed.updated_at;
    }

    /// Binds a management plugin.
    ///
    /// Re-binding the plugin that is already bound is a no-op and leaves the
    /// existing configuration untouched.
    pub fn assign_plugin(
        &mut self,
        plugin_id: PluginId,
        management_config: Option<Value>,
        at: DateTime<Utc>,
    ) -> PluginBindingChange {
        if self.management_plugin_id.as_ref() == Some(&plugin_id) {
            return PluginBindingChange::Unchanged;
        }
        let previous = self.management_plugin_id.replace(plugin_id);
        self.management_config = management_config;
        self.updated_at = at;
        previous.map_or(PluginBindingChange::Assigned, PluginBindingChange::Replaced)
    }

    /// Removes the plugin binding, returning the previously bound plugin.
    pub fn unassign_plugin(&mut self, at: DateTime<Utc>) -> Option<PluginId> {
        let previous = self.management_plugin_id.take();
        if previous.is_some() {
            self.management_config = None;
            self.updated_at = at;
        }
        previous
    }
}

fn validated_name(raw: &str) -> Result<String, InfrastructureDomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(InfrastructureDomainError::EmptyServiceName);
    }
    ensure_max_length("name", name, MAX_NAME_LENGTH)?;
    Ok(name.to_owned())
}
