//! Error types for infrastructure domain validation and parsing.

use super::ConnectionType;
use thiserror::Error;

/// Errors returned while constructing infrastructure domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InfrastructureDomainError {
    /// The instance name is empty after trimming.
    #[error("instance name must not be empty")]
    EmptyInstanceName,

    /// The instance host is empty after trimming.
    #[error("instance host must not be empty")]
    EmptyInstanceHost,

    /// The service name is empty after trimming.
    #[error("service name must not be empty")]
    EmptyServiceName,

    /// The connection configuration is not a JSON object.
    #[error("connection config must be a JSON object")]
    ConnectionConfigNotObject,

    /// A required connection configuration key is missing or blank.
    #[error("{connection_type} connection config requires '{key}'")]
    MissingConnectionField {
        /// Connection type being validated.
        connection_type: ConnectionType,
        /// Missing key in camelCase form.
        key: &'static str,
    },

    /// A connection configuration key holds a value of the wrong shape.
    #[error("{connection_type} connection config field '{key}' is invalid: {reason}")]
    InvalidConnectionField {
        /// Connection type being validated.
        connection_type: ConnectionType,
        /// Offending key in camelCase form.
        key: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// An endpoint URL is empty after trimming.
    #[error("service endpoint url must not be empty")]
    EmptyEndpointUrl,

    /// The plugin identifier is empty after trimming.
    #[error("management plugin id must not be empty")]
    EmptyPluginId,

    /// The space identifier is empty after trimming.
    #[error("space id must not be empty")]
    EmptySpaceId,

    /// A text field is longer than its stored column allows.
    #[error("{field} must be at most {max} characters")]
    FieldTooLong {
        /// Field name in camelCase form.
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },

    /// The port is zero.
    #[error("port must be between 1 and 65535")]
    InvalidPort,
}

/// Maximum length of names, hosts and identifiers.
pub(crate) const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of a protocol hint.
pub(crate) const MAX_PROTOCOL_LENGTH: usize = 20;

/// Rejects `value` when it has more than `max` characters.
pub(crate) fn ensure_max_length(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), InfrastructureDomainError> {
    if value.chars().count() > max {
        return Err(InfrastructureDomainError::FieldTooLong { field, max });
    }
    Ok(())
}

/// Error returned while parsing an enum value from its canonical string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseInfrastructureEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

impl ParseInfrastructureEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
