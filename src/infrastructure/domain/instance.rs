//! Infrastructure instance aggregate root.

use super::error::{MAX_NAME_LENGTH, MAX_PROTOCOL_LENGTH, ensure_max_length};
use super::{
    ConnectionConfig, ConnectionType, InfrastructureDomainError, InstanceHealthSnapshot,
    InstanceId, InstanceStatus, ParseInfrastructureEnumError, ResourceSnapshot, SpaceId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of compute target an instance represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceType {
    /// Virtual or bare-metal machine.
    Vm,
    /// Host running a Docker engine.
    DockerHost,
    /// Kubernetes cluster.
    Kubernetes,
    /// Cloud provider instance.
    CloudInstance,
}

impl InstanceType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vm => "vm",
            Self::DockerHost => "docker_host",
            Self::Kubernetes => "kubernetes",
            Self::CloudInstance => "cloud_instance",
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for InstanceType {
    type Error = ParseInfrastructureEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "vm" => Ok(Self::Vm),
            "docker_host" => Ok(Self::DockerHost),
            "kubernetes" => Ok(Self::Kubernetes),
            "cloud_instance" => Ok(Self::CloudInstance),
            _ => Err(ParseInfrastructureEnumError::new("instance type", value)),
        }
    }
}

/// Parameter object for registering a new instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    /// Display name.
    pub name: String,
    /// Kind of compute target.
    pub instance_type: InstanceType,
    /// Hostname or IP address.
    pub host: String,
    /// Optional port override.
    pub port: Option<u16>,
    /// Optional protocol hint, e.g. `https`.
    pub protocol: Option<String>,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Transport used to reach the instance.
    pub connection_type: ConnectionType,
    /// Credentials and transport settings.
    pub connection_config: ConnectionConfig,
    /// Tenant scope; `None` registers a global instance.
    pub space_id: Option<SpaceId>,
    /// Identifier of the registering user.
    pub created_by: Option<String>,
}

/// Parameter object for reconstructing persisted instance state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedInstanceData {
    /// Persisted identifier.
    pub id: InstanceId,
    /// Persisted name.
    pub name: String,
    /// Persisted instance type.
    pub instance_type: InstanceType,
    /// Persisted host.
    pub host: String,
    /// Persisted port.
    pub port: Option<u16>,
    /// Persisted protocol.
    pub protocol: Option<String>,
    /// Persisted description.
    pub description: Option<String>,
    /// Persisted connection type.
    pub connection_type: ConnectionType,
    /// Persisted connection configuration.
    pub connection_config: ConnectionConfig,
    /// Persisted status.
    pub status: InstanceStatus,
    /// Persisted last health check timestamp.
    pub last_health_check: Option<DateTime<Utc>>,
    /// Persisted health snapshot.
    pub health_status: Option<InstanceHealthSnapshot>,
    /// Persisted OS family.
    pub os_type: Option<String>,
    /// Persisted OS version.
    pub os_version: Option<String>,
    /// Persisted resource snapshot.
    pub resources: Option<ResourceSnapshot>,
    /// Persisted derived tags.
    pub tags: Vec<String>,
    /// Persisted space scope.
    pub space_id: Option<SpaceId>,
    /// Persisted creator.
    pub created_by: Option<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Registered remote compute target.
///
/// Status and health fields change only through health probe results, and
/// tags only through tag derivation; both mutators are crate-private.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureInstance {
    id: InstanceId,
    name: String,
    instance_type: InstanceType,
    host: String,
    port: Option<u16>,
    protocol: Option<String>,
    description: Option<String>,
    connection_type: ConnectionType,
    connection_config: ConnectionConfig,
    status: InstanceStatus,
    last_health_check: Option<DateTime<Utc>>,
    health_status: Option<InstanceHealthSnapshot>,
    os_type: Option<String>,
    os_version: Option<String>,
    resources: Option<ResourceSnapshot>,
    tags: Vec<String>,
    space_id: Option<SpaceId>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InfrastructureInstance {
    /// Registers a new instance in the `unknown` status.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError`] when the name or host is blank,
    /// a text field exceeds its stored length, the port is zero, or the
    /// connection configuration does not suit the connection type.
    pub fn new(spec: InstanceSpec, clock: &impl Clock) -> Result<Self, InfrastructureDomainError> {
        let name = spec.name.trim().to_owned();
        if name.is_empty() {
            return Err(InfrastructureDomainError::EmptyInstanceName);
        }
        ensure_max_length("name", &name, MAX_NAME_LENGTH)?;
        let host = spec.host.trim().to_owned();
        if host.is_empty() {
            return Err(InfrastructureDomainError::EmptyInstanceHost);
        }
        ensure_max_length("host", &host, MAX_NAME_LENGTH)?;
        if spec.port == Some(0) {
            return Err(InfrastructureDomainError::InvalidPort);
        }
        let protocol = normalize_optional(spec.protocol);
        if let Some(hint) = &protocol {
            ensure_max_length("protocol", hint, MAX_PROTOCOL_LENGTH)?;
        }
        let created_by = normalize_optional(spec.created_by);
        if let Some(user) = &created_by {
            ensure_max_length("createdBy", user, MAX_NAME_LENGTH)?;
        }
        spec.connection_config.validate_for(spec.connection_type)?;

        let timestamp = clock.utc();
        Ok(Self {
            id: InstanceId::new(),
            name,
            instance_type: spec.instance_type,
            host,
            port: spec.port,
            protocol,
            description: normalize_optional(spec.description),
            connection_type: spec.connection_type,
            connection_config: spec.connection_config,
            status: InstanceStatus::Unknown,
            last_health_check: None,
            health_status: None,
            os_type: None,
            os_version: None,
            resources: None,
            tags: Vec::new(),
            space_id: spec.space_id,
            created_by,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs an instance from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedInstanceData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            instance_type: data.instance_type,
            host: data.host,
            port: data.port,
            protocol: data.protocol,
            description: data.description,
            connection_type: data.connection_type,
            connection_config: data.connection_config,
            status: data.status,
            last_health_check: data.last_health_check,
            health_status: data.health_status,
            os_type: data.os_type,
            os_version: data.os_version,
            resources: data.resources,
            tags: data.tags,
            space_id: data.space_id,
            created_by: data.created_by,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the instance identifier.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instance type.
    #[must_use]
    pub const fn instance_type(&self) -> InstanceType {
        self.instance_type
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the optional port.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns the optional protocol hint.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the connection type.
    #[must_use]
    pub const fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    /// Returns the connection configuration.
    #[must_use]
    pub const fn connection_config(&self) -> &ConnectionConfig {
        &self.connection_config
    }

    /// Returns the last observed status.
    #[must_use]
    pub const fn status(&self) -> InstanceStatus {
        self.status
    }

    /// Returns the timestamp of the last health probe.
    #[must_use]
    pub const fn last_health_check(&self) -> Option<DateTime<Utc>> {
        self.last_health_check
    }

    /// Returns the last health snapshot.
    #[must_use]
    pub const fn health_status(&self) -> Option<&InstanceHealthSnapshot> {
        self.health_status.as_ref()
    }

    /// Returns the operating system family.
    #[must_use]
    pub fn os_type(&self) -> Option<&str> {
        self.os_type.as_deref()
    }

    /// Returns the operating system version.
    #[must_use]
    pub fn os_version(&self) -> Option<&str> {
        self.os_version.as_deref()
    }

    /// Returns the resource snapshot.
    #[must_use]
    pub const fn resources(&self) -> Option<&ResourceSnapshot> {
        self.resources.as_ref()
    }

    /// Returns the derived capability tags in sorted order.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns whether the instance carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    /// Returns the tenant scope.
    #[must_use]
    pub const fn space_id(&self) -> Option<&SpaceId> {
        self.space_id.as_ref()
    }

    /// Returns the registering user.
    #[must_use]
    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
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

    /// Replaces the connection configuration through the explicit update path.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError`] when the configuration does not
    /// suit the instance's connection type.
    pub fn update_connection(
        &mut self,
        connection_config: ConnectionConfig,
        at: DateTime<Utc>,
    ) -> Result<(), InfrastructureDomainError> {
        connection_config.validate_for(self.connection_type)?;
        self.set_connection_config(connection_config, at);
        Ok(())
    }

    /// Stores an already validated connection configuration.
    pub(crate) fn set_connection_config(
        &mut self,
        connection_config: ConnectionConfig,
        at: DateTime<Utc>,
    ) {
        self.connection_config = connection_config;
        self.updated_at = at;
    }

    /// Records a health probe result.
    ///
    /// System information in the snapshot refreshes the OS and resource
    /// fields; a probe without it leaves the previous values in place.
    pub(crate) fn record_health(&mut self, snapshot: InstanceHealthSnapshot) {
        self.status = snapshot.status();
        self.last_health_check = Some(snapshot.checked_at());
        if let Some(info) = snapshot.system_info() {
            if info.os_type.is_some() {
                self.os_type.clone_from(&info.os_type);
            }
            if info.os_version.is_some() {
                self.os_version.clone_from(&info.os_version);
            }
            if let Some(resources) = info.resources {
                self.resources = Some(resources);
            }
        }
        self.updated_at = snapshot.checked_at();
        self.health_status = Some(snapshot);
    }

    /// Replaces derived tags, returning whether they changed.
    pub(crate) fn replace_tags(&mut self, tags: &[String], at: DateTime<Utc>) -> bool {
        if self.tags == tags {
            return false;
        }
        self.tags = tags.to_vec();
        self.updated_at = at;
        true
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}
