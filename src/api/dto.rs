//! Request and response bodies of the REST facade.
//!
//! Responses are camelCase. Instance creation accepts the snake_case field
//! names of the original API along with camelCase aliases.

use super::ApiError;
use crate::infrastructure::{
    domain::{
        AssignOutcome, ConnectionConfig, ConnectionType, InfrastructureInstance,
        InstanceHealthSnapshot, InstanceId, InstanceService, InstanceServiceId, InstanceSpec,
        InstanceStatus, InstanceType, PluginBindingChange, PluginCompatibility, PluginId,
        ResourceSnapshot, ServiceEndpoint, ServiceOrigin, ServiceSpec, ServiceStatus, ServiceType,
        SpaceId, canonical_tag,
    },
    ports::InstanceFilter,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Instance as rendered by the API, with secrets redacted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResponse {
    /// Identifier.
    pub id: InstanceId,
    /// Display name.
    pub name: String,
    /// Instance type.
    #[serde(rename = "type")]
    pub instance_type: InstanceType,
    /// Host.
    pub host: String,
    /// Port.
    pub port: Option<u16>,
    /// Protocol hint.
    pub protocol: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Connection type.
    pub connection_type: ConnectionType,
    /// Connection configuration with secret values masked.
    pub connection_config: Value,
    /// Status.
    pub status: InstanceStatus,
    /// Last probe time.
    pub last_health_check: Option<DateTime<Utc>>,
    /// Last probe snapshot.
    pub health_status: Option<InstanceHealthSnapshot>,
    /// OS family.
    pub os_type: Option<String>,
    /// OS version.
    pub os_version: Option<String>,
    /// Resources.
    pub resources: Option<ResourceSnapshot>,
    /// Derived tags.
    pub tags: Vec<String>,
    /// Tenant scope.
    pub space_id: Option<SpaceId>,
    /// Registering user.
    pub created_by: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<&InfrastructureInstance> for InstanceResponse {
    fn from(instance: &InfrastructureInstance) -> Self {
        Self {
            id: instance.id(),
            name: instance.name().to_owned(),
            instance_type: instance.instance_type(),
            host: instance.host().to_owned(),
            port: instance.port(),
            protocol: instance.protocol().map(str::to_owned),
            description: instance.description().map(str::to_owned),
            connection_type: instance.connection_type(),
            connection_config: instance.connection_config().redacted(),
            status: instance.status(),
            last_health_check: instance.last_health_check(),
            health_status: instance.health_status().cloned(),
            os_type: instance.os_type().map(str::to_owned),
            os_version: instance.os_version().map(str::to_owned),
            resources: instance.resources().copied(),
            tags: instance.tags().to_vec(),
            space_id: instance.space_id().cloned(),
            created_by: instance.created_by().map(str::to_owned),
            created_at: instance.created_at(),
            updated_at: instance.updated_at(),
        }
    }
}

/// `{ instances }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceList {
    /// Instances.
    pub instances: Vec<InstanceResponse>,
}

/// Service as rendered by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    /// Identifier.
    pub id: InstanceServiceId,
    /// Owning instance.
    pub instance_id: Option<InstanceId>,
    /// Tenant scope of remote services.
    pub space_id: Option<SpaceId>,
    /// Name.
    pub name: String,
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    /// How the service was created.
    pub origin: ServiceOrigin,
    /// Status.
    pub status: ServiceStatus,
    /// Connector-specific payload.
    pub service_config: Value,
    /// Endpoints.
    pub endpoints: Vec<ServiceEndpoint>,
    /// Health check URL.
    pub health_check_url: Option<String>,
    /// Bound plugin.
    pub management_plugin_id: Option<PluginId>,
    /// Plugin configuration.
    pub management_config: Option<Value>,
    /// First discovery time.
    pub discovered_at: DateTime<Utc>,
    /// Last sighting time.
    pub last_seen: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<&InstanceService> for ServiceResponse {
    fn from(service: &InstanceService) -> Self {
        Self {
            id: service.id(),
            instance_id: service.instance_id(),
            space_id: service.space_id().cloned(),
            name: service.name().to_owned(),
            service_type: service.service_type(),
            origin: service.origin(),
            status: service.status(),
            service_config: service.service_config().clone(),
            endpoints: service.endpoints().to_vec(),
            health_check_url: service.health_check_url().map(str::to_owned),
            management_plugin_id: service.management_plugin_id().cloned(),
            management_config: service.management_config().cloned(),
            discovered_at: service.discovered_at(),
            last_seen: service.last_seen(),
            created_at: service.created_at(),
            updated_at: service.updated_at(),
        }
    }
}

/// `{ services }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceList {
    /// Services.
    pub services: Vec<ServiceResponse>,
}

impl ServiceList {
    /// Renders a list of services.
    #[must_use]
    pub fn from_services(services: &[InstanceService]) -> Self {
        Self {
            services: services.iter().map(ServiceResponse::from).collect(),
        }
    }
}

/// Query parameters for listing instances.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstancesQuery {
    /// Tenant scope.
    pub space_id: Option<String>,
    /// Instance type.
    #[serde(rename = "type")]
    pub instance_type: Option<String>,
    /// Status.
    pub status: Option<String>,
    /// Capability tag.
    pub tag: Option<String>,
}

impl TryFrom<ListInstancesQuery> for InstanceFilter {
    type Error = ApiError;

    fn try_from(query: ListInstancesQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            space_id: query
                .space_id
                .map(SpaceId::new)
                .transpose()
                .map_err(|err| ApiError::bad_request(err.to_string()))?,
            instance_type: query
                .instance_type
                .as_deref()
                .map(InstanceType::try_from)
                .transpose()
                .map_err(|err| ApiError::bad_request(err.to_string()))?,
            status: query
                .status
                .as_deref()
                .map(InstanceStatus::try_from)
                .transpose()
                .map_err(|err| ApiError::bad_request(err.to_string()))?,
            tag: query
                .tag
                .as_deref()
                .map(|raw| {
                    canonical_tag(raw).ok_or_else(|| {
                        ApiError::bad_request(format!("tag `{raw}` has no letters or digits"))
                    })
                })
                .transpose()?,
        })
    }
}

/// Body of `POST /infrastructure/instances`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInstanceRequest {
    /// Display name.
    pub name: String,
    /// Instance type.
    #[serde(rename = "type")]
    pub instance_type: String,
    /// Host.
    pub host: String,
    /// Port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Protocol hint.
    #[serde(default)]
    pub protocol: Option<String>,
    /// Connection type.
    #[serde(alias = "connectionType")]
    pub connection_type: String,
    /// Connection configuration.
    #[serde(default, alias = "connectionConfig")]
    pub connection_config: Value,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Tenant scope.
    #[serde(default, alias = "spaceId")]
    pub space_id: Option<String>,
    /// Registering user.
    #[serde(default, alias = "createdBy")]
    pub created_by: Option<String>,
}

impl TryFrom<CreateInstanceRequest> for InstanceSpec {
    type Error = ApiError;

    fn try_from(request: CreateInstanceRequest) -> Result<Self, Self::Error> {
        let bad_request = |err: &dyn std::error::Error| ApiError::bad_request(err.to_string());
        Ok(Self {
            name: request.name,
            instance_type: InstanceType::try_from(request.instance_type.as_str())
                .map_err(|err| bad_request(&err))?,
            host: request.host,
            port: request.port,
            protocol: request.protocol,
            description: request.description,
            connection_type: ConnectionType::try_from(request.connection_type.as_str())
                .map_err(|err| bad_request(&err))?,
            connection_config: ConnectionConfig::from_value(request.connection_config)
                .map_err(|err| bad_request(&err))?,
            space_id: request
                .space_id
                .map(SpaceId::new)
                .transpose()
                .map_err(|err| bad_request(&err))?,
            created_by: request.created_by,
        })
    }
}

/// Body of `PUT /infrastructure/instances/{id}/connection`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConnectionRequest {
    /// Replacement connection configuration.
    #[serde(alias = "connection_config", rename = "connectionConfig")]
    pub connection_config: Value,
}

/// Body of the service creation endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    /// Name.
    pub name: String,
    /// Service type; defaults to `application`.
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
    /// Free-form configuration.
    #[serde(default, alias = "service_config")]
    pub service_config: Option<Value>,
    /// Endpoints.
    #[serde(default)]
    pub endpoints: Vec<ServiceEndpoint>,
    /// Health check URL.
    #[serde(default, alias = "health_check_url")]
    pub health_check_url: Option<String>,
    /// Plugin to bind immediately.
    #[serde(default, alias = "management_plugin_id")]
    pub management_plugin_id: Option<String>,
    /// Tenant scope, for remote services.
    #[serde(default, alias = "space_id")]
    pub space_id: Option<String>,
}

impl TryFrom<CreateServiceRequest> for ServiceSpec {
    type Error = ApiError;

    fn try_from(request: CreateServiceRequest) -> Result<Self, Self::Error> {
        let bad_request = |err: &dyn std::error::Error| ApiError::bad_request(err.to_string());
        let endpoints = request
            .endpoints
            .into_iter()
            .map(|endpoint| ServiceEndpoint::new(endpoint.url, endpoint.port, endpoint.protocol))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| bad_request(&err))?;
        Ok(Self {
            name: request.name,
            service_type: request
                .service_type
                .as_deref()
                .map_or(Ok(ServiceType::Application), ServiceType::try_from)
                .map_err(|err| bad_request(&err))?,
            service_config: request
                .service_config
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            endpoints,
            health_check_url: request.health_check_url,
            management_plugin_id: request
                .management_plugin_id
                .map(PluginId::new)
                .transpose()
                .map_err(|err| bad_request(&err))?,
            space_id: request
                .space_id
                .map(SpaceId::new)
                .transpose()
                .map_err(|err| bad_request(&err))?,
        })
    }
}

/// Body of `POST /infrastructure/services/{id}/assign-plugin`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPluginRequest {
    /// Plugin to bind.
    #[serde(alias = "plugin_id")]
    pub plugin_id: String,
    /// Plugin configuration.
    #[serde(default)]
    pub config: Option<Value>,
}

/// Result of a plugin assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignPluginResponse {
    /// Always `true`.
    pub ok: bool,
    /// `unchanged`, `assigned` or `replaced`.
    pub change: &'static str,
    /// Advisory compatibility of the plugin with the service.
    pub compatibility: PluginCompatibility,
}

impl From<AssignOutcome> for AssignPluginResponse {
    fn from(outcome: AssignOutcome) -> Self {
        let change = match outcome.change {
            PluginBindingChange::Unchanged => "unchanged",
            PluginBindingChange::Assigned => "assigned",
            PluginBindingChange::Replaced(_) => "replaced",
        };
        Self {
            ok: true,
            change,
            compatibility: outcome.compatibility,
        }
    }
}

/// Body of `POST /infrastructure/instances/{id}/execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// Shell command line.
    pub command: String,
}

/// Command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteResponse {
    /// Standard output.
    pub output: String,
}

/// `{ tags }` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagList {
    /// Sorted, de-duplicated tags.
    pub tags: Vec<String>,
}

/// `{ ok }` acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Always `true`.
    pub ok: bool,
}

impl Ack {
    /// Successful acknowledgement.
    pub const OK: Self = Self { ok: true };
}
