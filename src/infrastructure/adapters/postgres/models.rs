//! Diesel row models for infrastructure persistence.

use super::schema::{infrastructure_instances, instance_services};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Row of `infrastructure_instances`.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = infrastructure_instances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InstanceRow {
    /// Instance identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Instance type.
    pub instance_type: String,
    /// Host.
    pub host: String,
    /// Optional port.
    pub port: Option<i32>,
    /// Optional protocol hint.
    pub protocol: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Connection type.
    pub connection_type: String,
    /// Connection configuration.
    pub connection_config: Value,
    /// Status.
    pub status: String,
    /// Last health probe timestamp.
    pub last_health_check: Option<DateTime<Utc>>,
    /// Last health snapshot.
    pub health_status: Option<Value>,
    /// OS family.
    pub os_type: Option<String>,
    /// OS version.
    pub os_version: Option<String>,
    /// Resource snapshot.
    pub resources: Option<Value>,
    /// Derived tags.
    pub tags: Value,
    /// Tenant scope.
    pub space_id: Option<String>,
    /// Registering user.
    pub created_by: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row of `instance_services`.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = instance_services)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServiceRow {
    /// Service identifier.
    pub id: uuid::Uuid,
    /// Owning instance.
    pub instance_id: Option<uuid::Uuid>,
    /// Tenant scope of remote services.
    pub space_id: Option<String>,
    /// Name.
    pub name: String,
    /// Service type.
    pub service_type: String,
    /// Origin.
    pub origin: String,
    /// Status.
    pub status: String,
    /// Connector-specific payload.
    pub service_config: Value,
    /// Endpoints.
    pub endpoints: Value,
    /// Health check URL.
    pub health_check_url: Option<String>,
    /// Bound plugin.
    pub management_plugin_id: Option<String>,
    /// Plugin configuration.
    pub management_config: Option<Value>,
    /// First discovery timestamp.
    pub discovered_at: DateTime<Utc>,
    /// Last sighting timestamp.
    pub last_seen: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
