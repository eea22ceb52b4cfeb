//! Mapping of service errors onto HTTP responses.

use crate::infrastructure::{
    ports::{ConnectorError, DiscoveryError, InfrastructureRepositoryError},
    services::InfrastructureServiceError,
};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Error rendered as `{ "error": message }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates an error with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates a 400 error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

const fn connector_status(err: &ConnectorError) -> StatusCode {
    match err {
        ConnectorError::InvalidConfig(_)
        | ConnectorError::Unsupported { .. }
        | ConnectorError::UnsupportedConnectionType(_) => StatusCode::BAD_REQUEST,
        ConnectorError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ConnectorError::Connection(_)
        | ConnectorError::Authentication { .. }
        | ConnectorError::Command { .. }
        | ConnectorError::Protocol(_) => StatusCode::BAD_GATEWAY,
    }
}

const fn repository_status(err: &InfrastructureRepositoryError) -> StatusCode {
    match err {
        InfrastructureRepositoryError::DuplicateInstance(_)
        | InfrastructureRepositoryError::DuplicateInstanceName(_)
        | InfrastructureRepositoryError::DuplicateService(_) => StatusCode::CONFLICT,
        InfrastructureRepositoryError::InstanceNotFound(_)
        | InfrastructureRepositoryError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
        InfrastructureRepositoryError::InvalidPersistedData(_)
        | InfrastructureRepositoryError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<InfrastructureServiceError> for ApiError {
    fn from(err: InfrastructureServiceError) -> Self {
        let status = match &err {
            InfrastructureServiceError::Domain(_) => StatusCode::BAD_REQUEST,
            InfrastructureServiceError::Repository(inner) => repository_status(inner),
            InfrastructureServiceError::Connector(inner)
            | InfrastructureServiceError::Discovery(DiscoveryError::Connector(inner)) => {
                connector_status(inner)
            }
            InfrastructureServiceError::Discovery(DiscoveryError::Unsupported(_)) => {
                StatusCode::BAD_REQUEST
            }
            InfrastructureServiceError::Marketplace(_) => StatusCode::BAD_GATEWAY,
            InfrastructureServiceError::InstanceNotFound(_)
            | InfrastructureServiceError::ServiceNotFound(_)
            | InfrastructureServiceError::PluginNotFound(_) => StatusCode::NOT_FOUND,
            InfrastructureServiceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}
