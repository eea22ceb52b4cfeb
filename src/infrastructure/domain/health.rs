//! Instance status, resource and health snapshot domain types.

use super::ParseInfrastructureEnumError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reachability status of an instance as last observed by the health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// The health probe succeeded.
    Online,
    /// The connector reported a negative health signal.
    Offline,
    /// The probe could not be attempted at all.
    Error,
    /// No probe has run yet.
    #[default]
    Unknown,
}

impl InstanceStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for InstanceStatus {
    type Error = ParseInfrastructureEnumError;

    fn try_from(value: &str) -> Result<Self, ParseInfrastructureEnumError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "error" => Ok(Self::Error),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseInfrastructureEnumError::new("instance status", value)),
        }
    }
}

/// Resource capacity of an instance. Memory and disk are in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Logical CPU cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// Total memory in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Root filesystem size in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
}

impl ResourceSnapshot {
    /// Returns whether no resource field is known.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none() && self.disk.is_none()
    }
}

/// Partial system information reported by a connector.
///
/// Every field is optional: connectors omit what they could not determine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    /// Operating system family, e.g. `Linux`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    /// Operating system or kernel version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    /// Resource capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSnapshot>,
}

impl SystemInfo {
    /// Returns whether nothing was reported.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.os_type.is_none() && self.os_version.is_none() && self.resources.is_none()
    }
}

/// Free-form snapshot of the last health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHealthSnapshot {
    status: InstanceStatus,
    checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_info: Option<SystemInfo>,
}

impl InstanceHealthSnapshot {
    /// Creates a snapshot for an observed status.
    #[must_use]
    pub const fn new(status: InstanceStatus, checked_at: DateTime<Utc>) -> Self {
        Self {
            status,
            checked_at,
            message: None,
            system_info: None,
        }
    }

    /// Adds an explanatory message; blank messages are ignored.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let normalized = message.into().trim().to_owned();
        if !normalized.is_empty() {
            self.message = Some(normalized);
        }
        self
    }

    /// Attaches the system information gathered alongside the probe.
    #[must_use]
    pub fn with_system_info(mut self, system_info: SystemInfo) -> Self {
        if !system_info.is_empty() {
            self.system_info = Some(system_info);
        }
        self
    }

    /// Returns the probed status.
    #[must_use]
    pub const fn status(&self) -> InstanceStatus {
        self.status
    }

    /// Returns the probe timestamp.
    #[must_use]
    pub const fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Returns the optional detail message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the system information captured with the probe.
    #[must_use]
    pub const fn system_info(&self) -> Option<&SystemInfo> {
        self.system_info.as_ref()
    }
}
