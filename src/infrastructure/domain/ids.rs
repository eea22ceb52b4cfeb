//! Identifier types for infrastructure instances, services, spaces and plugins.

use super::InfrastructureDomainError;
use super::error::{MAX_NAME_LENGTH, ensure_max_length};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a registered infrastructure instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a new random instance identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an instance identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for InstanceId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a service running on (or bound to) an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceServiceId(Uuid);

impl InstanceServiceId {
    /// Creates a new random service identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a service identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for InstanceServiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for InstanceServiceId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for InstanceServiceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Tenant scope for instances and remote services.
///
/// A missing space means the record is global.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(String);

impl SpaceId {
    /// Creates a validated space identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::EmptySpaceId`] when the value is
    /// empty after trimming, or [`InfrastructureDomainError::FieldTooLong`]
    /// past 255 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, InfrastructureDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(InfrastructureDomainError::EmptySpaceId);
        }
        ensure_max_length("spaceId", &normalized, MAX_NAME_LENGTH)?;
        Ok(Self(normalized))
    }

    /// Returns the space identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SpaceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Marketplace identifier of a management plugin.
///
/// The marketplace owns the identifier format; this crate only requires it
/// to be non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// Creates a validated plugin identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::EmptyPluginId`] when the value is
    /// empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, InfrastructureDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(InfrastructureDomainError::EmptyPluginId);
        }
        ensure_max_length("pluginId", &normalized, MAX_NAME_LENGTH)?;
        Ok(Self(normalized))
    }

    /// Returns the plugin identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
