//! REST handlers. Each one delegates to a single service call.

use super::{
    ApiError, ApiState,
    dto::{
        Ack, AssignPluginRequest, AssignPluginResponse, CreateInstanceRequest,
        CreateServiceRequest, ExecuteRequest, ExecuteResponse, InstanceList, InstanceResponse,
        ListInstancesQuery, ServiceList, ServiceResponse, TagList, UpdateConnectionRequest,
    },
};
use crate::infrastructure::{
    domain::{ConnectionConfig, InstanceId, InstanceServiceId, InstanceSpec, PluginId, ServiceSpec},
    ports::InstanceFilter,
};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

type ApiResult<T> = Result<T, ApiError>;

/// GET /infrastructure/instances
pub async fn list_instances(
    State(state): State<ApiState>,
    query: Result<Query<ListInstancesQuery>, QueryRejection>,
) -> ApiResult<Json<InstanceList>> {
    let Query(query) = query?;
    let filter = InstanceFilter::try_from(query)?;
    let instances = state.registry.list_instances(&filter).await?;
    Ok(Json(InstanceList {
        instances: instances.iter().map(InstanceResponse::from).collect(),
    }))
}

/// POST /infrastructure/instances
pub async fn create_instance(
    State(state): State<ApiState>,
    body: Result<Json<CreateInstanceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InstanceResponse>)> {
    let Json(request) = body?;
    let spec = InstanceSpec::try_from(request)?;
    let instance = state.registry.register_instance(spec).await?;
    Ok((StatusCode::CREATED, Json(InstanceResponse::from(&instance))))
}

/// GET /infrastructure/instances/{id}
pub async fn get_instance(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<InstanceResponse>> {
    let Path(id) = path?;
    let instance = state
        .registry
        .find_instance(InstanceId::from_uuid(id))
        .await?;
    Ok(Json(InstanceResponse::from(&instance)))
}

/// DELETE /infrastructure/instances/{id}
pub async fn delete_instance(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Ack>> {
    let Path(id) = path?;
    state
        .registry
        .delete_instance(InstanceId::from_uuid(id))
        .await?;
    Ok(Json(Ack::OK))
}

/// PUT /infrastructure/instances/{id}/connection
pub async fn update_connection(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateConnectionRequest>, JsonRejection>,
) -> ApiResult<Json<InstanceResponse>> {
    let Path(id) = path?;
    let Json(request) = body?;
    let config = ConnectionConfig::from_value(request.connection_config)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let instance = state
        .registry
        .update_connection(InstanceId::from_uuid(id), config)
        .await?;
    Ok(Json(InstanceResponse::from(&instance)))
}

/// POST /infrastructure/instances/{id}/test-connection
pub async fn test_connection(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Ack>> {
    let Path(id) = path?;
    state
        .connections
        .test_connection(InstanceId::from_uuid(id))
        .await?;
    Ok(Json(Ack::OK))
}

/// POST /infrastructure/instances/{id}/execute
pub async fn execute_command(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<Json<ExecuteResponse>> {
    let Path(id) = path?;
    let Json(request) = body?;
    if request.command.trim().is_empty() {
        return Err(ApiError::bad_request("command must not be empty"));
    }
    let output = state
        .connections
        .execute(InstanceId::from_uuid(id), &request.command)
        .await?;
    Ok(Json(ExecuteResponse { output }))
}

/// POST /infrastructure/instances/{id}/health-check
pub async fn health_check(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<InstanceResponse>> {
    let Path(id) = path?;
    let instance = state.health.probe(InstanceId::from_uuid(id)).await?;
    Ok(Json(InstanceResponse::from(&instance)))
}

/// POST /infrastructure/instances/{id}/discover
pub async fn discover_services(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ServiceList>> {
    let Path(id) = path?;
    let services = state.discovery.discover(InstanceId::from_uuid(id)).await?;
    Ok(Json(ServiceList::from_services(&services)))
}

/// GET /infrastructure/instances/{id}/services
pub async fn list_services(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ServiceList>> {
    let Path(id) = path?;
    let services = state
        .registry
        .list_services(InstanceId::from_uuid(id))
        .await?;
    Ok(Json(ServiceList::from_services(&services)))
}

/// POST /infrastructure/instances/{id}/services
pub async fn add_service(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ServiceResponse>)> {
    let Path(id) = path?;
    let Json(request) = body?;
    let spec = ServiceSpec::try_from(request)?;
    let service = state
        .registry
        .add_service(InstanceId::from_uuid(id), spec)
        .await?;
    Ok((StatusCode::CREATED, Json(ServiceResponse::from(&service))))
}

/// GET /infrastructure/instances/{id}/tags
pub async fn instance_tags(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<TagList>> {
    let Path(id) = path?;
    let tags = state.tags.tags(InstanceId::from_uuid(id)).await?;
    Ok(Json(TagList { tags }))
}

/// POST /infrastructure/services/remote
pub async fn register_remote_service(
    State(state): State<ApiState>,
    body: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ServiceResponse>)> {
    let Json(request) = body?;
    let spec = ServiceSpec::try_from(request)?;
    let service = state.registry.register_remote_service(spec).await?;
    Ok((StatusCode::CREATED, Json(ServiceResponse::from(&service))))
}

/// POST /infrastructure/services/{id}/assign-plugin
pub async fn assign_plugin(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AssignPluginRequest>, JsonRejection>,
) -> ApiResult<Json<AssignPluginResponse>> {
    let Path(id) = path?;
    let Json(request) = body?;
    let plugin_id =
        PluginId::new(request.plugin_id).map_err(|err| ApiError::bad_request(err.to_string()))?;
    let outcome = state
        .bindings
        .assign(InstanceServiceId::from_uuid(id), plugin_id, request.config)
        .await?;
    Ok(Json(AssignPluginResponse::from(outcome)))
}

/// DELETE /infrastructure/services/{id}/assign-plugin
pub async fn unassign_plugin(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Ack>> {
    let Path(id) = path?;
    state
        .bindings
        .unassign(InstanceServiceId::from_uuid(id))
        .await?;
    Ok(Json(Ack::OK))
}

/// GET /infrastructure/services/{id}/component
pub async fn service_component(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    let component = state
        .bindings
        .load_component(InstanceServiceId::from_uuid(id))
        .await?;
    Ok(Json(json!({ "component": component })))
}
