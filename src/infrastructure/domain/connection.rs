//! Connection type and credential configuration value objects.
//!
//! The persisted connection configuration is an opaque JSON object whose shape
//! depends on the [`ConnectionType`]. Typed views ([`SshCredentials`],
//! [`DockerEndpoint`], [`KubernetesAccess`]) are derived on demand when a
//! connector is built, so the stored payload stays loosely validated.

use super::{InfrastructureDomainError, ParseInfrastructureEnumError};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Default Docker Engine TCP port when neither config nor instance sets one.
pub const DEFAULT_DOCKER_PORT: u16 = 2375;

/// Default SSH port when the instance does not set one.
pub const DEFAULT_SSH_PORT: u16 = 22;

const REDACTED: &str = "********";

const SECRET_KEYS: &[&str] = &[
    "password",
    "privateKey",
    "private_key",
    "passphrase",
    "kubeconfig",
    "token",
];

/// Transport used to reach an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Remote shell over SSH.
    Ssh,
    /// Docker Engine REST API.
    DockerApi,
    /// Kubernetes API server.
    Kubernetes,
    /// Plain HTTP endpoint.
    Http,
}

impl ConnectionType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::DockerApi => "docker_api",
            Self::Kubernetes => "kubernetes",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConnectionType {
    type Error = ParseInfrastructureEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "ssh" => Ok(Self::Ssh),
            "docker_api" | "docker" => Ok(Self::DockerApi),
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            "http" => Ok(Self::Http),
            _ => Err(ParseInfrastructureEnumError::new("connection type", value)),
        }
    }
}

/// Opaque credential map whose schema depends on the connection type.
///
/// `Debug` output and [`ConnectionConfig::redacted`] never include secret
/// values.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionConfig(Map<String, Value>);

impl ConnectionConfig {
    /// Wraps a JSON object as a connection configuration.
    #[must_use]
    pub const fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Converts an arbitrary JSON value into a connection configuration.
    ///
    /// `null` is treated as an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::ConnectionConfigNotObject`] when
    /// the value is neither an object nor `null`.
    pub fn from_value(value: Value) -> Result<Self, InfrastructureDomainError> {
        match value {
            Value::Object(values) => Ok(Self(values)),
            Value::Null => Ok(Self::default()),
            _ => Err(InfrastructureDomainError::ConnectionConfigNotObject),
        }
    }

    /// Returns the raw JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the configuration as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Returns a copy with secret values masked.
    #[must_use]
    pub fn redacted(&self) -> Value {
        let masked = self
            .0
            .iter()
            .map(|(key, value)| {
                if SECRET_KEYS.contains(&key.as_str()) {
                    (key.clone(), Value::String(REDACTED.to_owned()))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect();
        Value::Object(masked)
    }

    /// Loosely validates the configuration for a connection type.
    ///
    /// Only fields the connectors cannot work without are checked.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError`] when a required field is missing
    /// or has the wrong shape.
    pub fn validate_for(
        &self,
        connection_type: ConnectionType,
    ) -> Result<(), InfrastructureDomainError> {
        match connection_type {
            ConnectionType::Ssh => self.ssh_credentials().map(|_| ()),
            ConnectionType::DockerApi => {
                self.optional_port(connection_type)?;
                self.string_field(connection_type, "socketPath", "socket_path")?;
                Ok(())
            }
            ConnectionType::Kubernetes => self.kubernetes_access().map(|_| ()),
            ConnectionType::Http => Ok(()),
        }
    }

    /// Derives SSH credentials.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::MissingConnectionField`] when
    /// `username` is absent or blank.
    pub fn ssh_credentials(&self) -> Result<SshCredentials, InfrastructureDomainError> {
        let kind = ConnectionType::Ssh;
        let username = self
            .string_field(kind, "username", "username")?
            .ok_or(InfrastructureDomainError::MissingConnectionField {
                connection_type: kind,
                key: "username",
            })?;

        let password = self.string_field(kind, "password", "password")?;
        let private_key = self.string_field(kind, "privateKey", "private_key")?;
        let passphrase = self.string_field(kind, "passphrase", "passphrase")?;

        let auth = match (private_key, password) {
            (Some(key), _) => SshAuth::PrivateKey {
                key: SecretString::from(key),
                passphrase: passphrase.map(SecretString::from),
            },
            (None, Some(secret)) => SshAuth::Password(SecretString::from(secret)),
            (None, None) => SshAuth::None,
        };

        Ok(SshCredentials { username, auth })
    }

    /// Derives the Docker Engine endpoint.
    ///
    /// A `socketPath` wins; otherwise the endpoint is built from the
    /// configured (or instance-level) protocol, host and port.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::InvalidConnectionField`] when
    /// `port` or `socketPath` has the wrong shape.
    pub fn docker_endpoint(
        &self,
        host: &str,
        instance_port: Option<u16>,
        instance_protocol: Option<&str>,
    ) -> Result<DockerEndpoint, InfrastructureDomainError> {
        let kind = ConnectionType::DockerApi;
        if let Some(path) = self.string_field(kind, "socketPath", "socket_path")? {
            return Ok(DockerEndpoint::UnixSocket(PathBuf::from(path)));
        }

        let protocol = self
            .string_field(kind, "protocol", "protocol")?
            .or_else(|| instance_protocol.map(str::to_owned))
            .filter(|value| value == "http" || value == "https")
            .unwrap_or_else(|| String::from("http"));
        let port = self
            .optional_port(kind)?
            .or(instance_port)
            .unwrap_or(DEFAULT_DOCKER_PORT);
        let target_host = self
            .string_field(kind, "host", "host")?
            .unwrap_or_else(|| host.to_owned());

        Ok(DockerEndpoint::Tcp {
            base_url: format!("{protocol}://{target_host}:{port}"),
        })
    }

    /// Derives Kubernetes access settings.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureDomainError::InvalidConnectionField`] when
    /// `kubeconfig` is not a string.
    pub fn kubernetes_access(&self) -> Result<KubernetesAccess, InfrastructureDomainError> {
        let kubeconfig =
            self.string_field(ConnectionType::Kubernetes, "kubeconfig", "kubeconfig")?;
        Ok(KubernetesAccess {
            kubeconfig: kubeconfig.map(SecretString::from),
        })
    }

    fn lookup(&self, camel: &str, snake: &str) -> Option<&Value> {
        self.0.get(camel).or_else(|| self.0.get(snake))
    }

    fn string_field(
        &self,
        connection_type: ConnectionType,
        key: &'static str,
        snake: &str,
    ) -> Result<Option<String>, InfrastructureDomainError> {
        match self.lookup(key, snake) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => {
                let trimmed = value.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
            }
            Some(_) => Err(InfrastructureDomainError::InvalidConnectionField {
                connection_type,
                key,
                reason: String::from("expected a string"),
            }),
        }
    }

    fn optional_port(
        &self,
        connection_type: ConnectionType,
    ) -> Result<Option<u16>, InfrastructureDomainError> {
        let invalid = || InfrastructureDomainError::InvalidConnectionField {
            connection_type,
            key: "port",
            reason: String::from("expected a port number between 1 and 65535"),
        };
        match self.lookup("port", "port") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => number
                .as_u64()
                .and_then(|port| u16::try_from(port).ok())
                .filter(|port| *port != 0)
                .map(Some)
                .ok_or_else(invalid),
            Some(Value::String(text)) => text
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .map(Some)
                .ok_or_else(invalid),
            Some(_) => Err(invalid()),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("ConnectionConfig")
            .field(&self.redacted())
            .finish()
    }
}

/// SSH authentication material.
#[derive(Debug)]
pub enum SshAuth {
    /// No secret configured; the server may still accept `none` auth.
    None,
    /// Password authentication.
    Password(SecretString),
    /// Private key authentication with an optional passphrase.
    PrivateKey {
        /// PEM/OpenSSH encoded private key.
        key: SecretString,
        /// Passphrase protecting the key.
        passphrase: Option<SecretString>,
    },
}

/// Typed SSH credentials derived from a [`ConnectionConfig`].
#[derive(Debug)]
pub struct SshCredentials {
    username: String,
    auth: SshAuth,
}

impl SshCredentials {
    /// Returns the login user.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the authentication material.
    #[must_use]
    pub const fn auth(&self) -> &SshAuth {
        &self.auth
    }
}

/// Docker Engine API base location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    /// Local Unix domain socket, e.g. `/var/run/docker.sock`.
    UnixSocket(PathBuf),
    /// Remote TCP endpoint, e.g. `http://10.0.0.5:2375`.
    Tcp {
        /// Base URL without a trailing slash.
        base_url: String,
    },
}

/// Kubernetes access settings.
#[derive(Debug)]
pub struct KubernetesAccess {
    kubeconfig: Option<SecretString>,
}

impl KubernetesAccess {
    /// Returns whether a kubeconfig was supplied.
    #[must_use]
    pub const fn has_kubeconfig(&self) -> bool {
        self.kubeconfig.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn config(value: Value) -> ConnectionConfig {
        ConnectionConfig::from_value(value).expect("object config")
    }

    #[test]
    fn ssh_requires_username() {
        let result = config(json!({"password": "hunter2"})).validate_for(ConnectionType::Ssh);
        assert_eq!(
            result,
            Err(InfrastructureDomainError::MissingConnectionField {
                connection_type: ConnectionType::Ssh,
                key: "username",
            })
        );
    }

    #[test]
    fn ssh_private_key_takes_precedence_over_password() {
        let credentials = config(json!({
            "username": "root",
            "password": "pw",
            "private_key": "KEY",
            "passphrase": "phrase",
        }))
        .ssh_credentials()
        .expect("valid credentials");

        assert_eq!(credentials.username(), "root");
        match credentials.auth() {
            SshAuth::PrivateKey { key, passphrase } => {
                assert_eq!(key.expose_secret(), "KEY");
                assert_eq!(
                    passphrase.as_ref().map(|secret| secret.expose_secret()),
                    Some("phrase")
                );
            }
            other => panic!("expected private key auth, got {other:?}"),
        }
    }

    #[rstest]
    #[case(json!({"socketPath": "/var/run/docker.sock"}), DockerEndpoint::UnixSocket(PathBuf::from("/var/run/docker.sock")))]
    #[case(json!({}), DockerEndpoint::Tcp { base_url: String::from("http://10.0.0.5:2375") })]
    #[case(json!({"port": 2376, "protocol": "https"}), DockerEndpoint::Tcp { base_url: String::from("https://10.0.0.5:2376") })]
    #[case(json!({"port": "4243"}), DockerEndpoint::Tcp { base_url: String::from("http://10.0.0.5:4243") })]
    fn docker_endpoint_resolution(#[case] raw: Value, #[case] expected: DockerEndpoint) {
        let endpoint = config(raw)
            .docker_endpoint("10.0.0.5", None, None)
            .expect("valid endpoint");
        assert_eq!(endpoint, expected);
    }

    #[test]
    fn docker_endpoint_falls_back_to_instance_port_and_protocol() {
        let endpoint = ConnectionConfig::default()
            .docker_endpoint("docker.internal", Some(8080), Some("https"))
            .expect("valid endpoint");
        assert_eq!(
            endpoint,
            DockerEndpoint::Tcp {
                base_url: String::from("https://docker.internal:8080")
            }
        );
    }

    #[test]
    fn invalid_docker_port_is_rejected() {
        let result = config(json!({"port": 70000})).validate_for(ConnectionType::DockerApi);
        assert!(matches!(
            result,
            Err(InfrastructureDomainError::InvalidConnectionField { key: "port", .. })
        ));
    }

    #[test]
    fn redaction_masks_secrets_only() {
        let raw = config(json!({"username": "root", "password": "hunter2", "kubeconfig": "x"}));
        let redacted = raw.redacted();
        assert_eq!(redacted["username"], "root");
        assert_eq!(redacted["password"], REDACTED);
        assert_eq!(redacted["kubeconfig"], REDACTED);
        assert!(!format!("{raw:?}").contains("hunter2"));
    }

    #[test]
    fn non_object_config_is_rejected() {
        assert_eq!(
            ConnectionConfig::from_value(json!(["root"])),
            Err(InfrastructureDomainError::ConnectionConfigNotObject)
        );
    }

    #[rstest]
    #[case("docker_api", ConnectionType::DockerApi)]
    #[case(" SSH ", ConnectionType::Ssh)]
    #[case("k8s", ConnectionType::Kubernetes)]
    fn connection_type_parsing(#[case] raw: &str, #[case] expected: ConnectionType) {
        assert_eq!(ConnectionType::try_from(raw), Ok(expected));
    }
}
