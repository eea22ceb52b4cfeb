//! `PostgreSQL` store for instances and services.

use super::{
    models::{InstanceRow, ServiceRow},
    schema::{infrastructure_instances, instance_services},
};
use crate::infrastructure::{
    domain::{
        ConnectionConfig, ConnectionType, InfrastructureInstance, InstanceHealthSnapshot,
        InstanceId, InstanceService, InstanceServiceId, InstanceStatus, InstanceType,
        PersistedInstanceData, PersistedServiceData, PluginBindingChange, PluginId, ServiceOrigin,
        ServiceStatus, ServiceType, SpaceId,
    },
    ports::{
        InfrastructureRepositoryError, InfrastructureRepositoryResult, InstanceFilter,
        InstanceRepository, InstanceServiceRepository,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::{Value, json};

/// `PostgreSQL` connection pool type for infrastructure adapters.
pub type InfrastructurePgPool = Pool<ConnectionManager<PgConnection>>;

const NAME_INDEX: &str = "idx_infrastructure_instances_space_name";

/// `PostgreSQL`-backed infrastructure store.
#[derive(Debug, Clone)]
pub struct PostgresInfrastructureStore {
    pool: InfrastructurePgPool,
}

impl PostgresInfrastructureStore {
    /// Creates a store from a `PostgreSQL` pool.
    #[must_use]
    pub const fn new(pool: InfrastructurePgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> InfrastructureRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> InfrastructureRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(InfrastructureRepositoryError::persistence)?;
            operation(&mut connection)
        })
        .await
        .map_err(InfrastructureRepositoryError::persistence)?
    }
}

impl From<DieselError> for InfrastructureRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl InstanceRepository for PostgresInfrastructureStore {
    async fn insert_instance(
        &self,
        instance: &InfrastructureInstance,
    ) -> InfrastructureRepositoryResult<()> {
        let instance_id = instance.id();
        let name = instance.name().to_owned();
        let row = instance_to_row(instance)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(infrastructure_instances::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if info.constraint_name() == Some(NAME_INDEX) =>
                    {
                        InfrastructureRepositoryError::DuplicateInstanceName(name.clone())
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        InfrastructureRepositoryError::DuplicateInstance(instance_id)
                    }
                    _ => InfrastructureRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_connection(
        &self,
        instance_id: InstanceId,
        connection_config: &ConnectionConfig,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<InfrastructureInstance> {
        let config = connection_config.clone();
        self.run_blocking(move |connection| {
            connection.transaction::<_, InfrastructureRepositoryError, _>(|transaction| {
                let mut instance = lock_instance(transaction, instance_id)?;
                instance.set_connection_config(config, updated_at);
                diesel::update(infrastructure_instances::table.find(instance_id.into_inner()))
                    .set((
                        infrastructure_instances::connection_config
                            .eq(instance.connection_config().to_value()),
                        infrastructure_instances::updated_at.eq(instance.updated_at()),
                    ))
                    .execute(transaction)?;
                Ok(instance)
            })
        })
        .await
    }

    async fn record_health(
        &self,
        instance_id: InstanceId,
        snapshot: &InstanceHealthSnapshot,
    ) -> InfrastructureRepositoryResult<InfrastructureInstance> {
        let observed = snapshot.clone();
        self.run_blocking(move |connection| {
            connection.transaction::<_, InfrastructureRepositoryError, _>(|transaction| {
                let mut instance = lock_instance(transaction, instance_id)?;
                instance.record_health(observed);
                let row = instance_to_row(&instance)?;
                diesel::update(infrastructure_instances::table.find(row.id))
                    .set((
                        infrastructure_instances::status.eq(&row.status),
                        infrastructure_instances::last_health_check.eq(row.last_health_check),
                        infrastructure_instances::health_status.eq(&row.health_status),
                        infrastructure_instances::os_type.eq(&row.os_type),
                        infrastructure_instances::os_version.eq(&row.os_version),
                        infrastructure_instances::resources.eq(&row.resources),
                        infrastructure_instances::updated_at.eq(row.updated_at),
                    ))
                    .execute(transaction)?;
                Ok(instance)
            })
        })
        .await
    }

    async fn replace_tags(
        &self,
        instance_id: InstanceId,
        tags: &[String],
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<bool> {
        let derived = tags.to_vec();
        self.run_blocking(move |connection| {
            connection.transaction::<_, InfrastructureRepositoryError, _>(|transaction| {
                let mut instance = lock_instance(transaction, instance_id)?;
                if !instance.replace_tags(&derived, updated_at) {
                    return Ok(false);
                }
                diesel::update(infrastructure_instances::table.find(instance_id.into_inner()))
                    .set((
                        infrastructure_instances::tags.eq(json!(instance.tags())),
                        infrastructure_instances::updated_at.eq(instance.updated_at()),
                    ))
                    .execute(transaction)?;
                Ok(true)
            })
        })
        .await
    }

    async fn find_instance(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<Option<InfrastructureInstance>> {
        self.run_blocking(move |connection| {
            let row = infrastructure_instances::table
                .filter(infrastructure_instances::id.eq(instance_id.into_inner()))
                .select(InstanceRow::as_select())
                .first::<InstanceRow>(connection)
                .optional()?;
            row.map(row_to_instance).transpose()
        })
        .await
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
    ) -> InfrastructureRepositoryResult<Vec<InfrastructureInstance>> {
        let criteria = filter.clone();
        self.run_blocking(move |connection| {
            let mut query = infrastructure_instances::table
                .select(InstanceRow::as_select())
                .into_boxed();
            if let Some(space_id) = &criteria.space_id {
                query = query
                    .filter(infrastructure_instances::space_id.eq(space_id.as_str().to_owned()));
            }
            if let Some(instance_type) = criteria.instance_type {
                query = query
                    .filter(infrastructure_instances::instance_type.eq(instance_type.as_str()));
            }
            if let Some(status) = criteria.status {
                query = query.filter(infrastructure_instances::status.eq(status.as_str()));
            }
            let rows = query
                .order((
                    infrastructure_instances::created_at.asc(),
                    infrastructure_instances::id.asc(),
                ))
                .load::<InstanceRow>(connection)?;

            let mut instances = Vec::with_capacity(rows.len());
            for row in rows {
                let instance = row_to_instance(row)?;
                if criteria.matches(&instance) {
                    instances.push(instance);
                }
            }
            Ok(instances)
        })
        .await
    }

    async fn delete_instance(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<()> {
        let raw_id = instance_id.into_inner();
        self.run_blocking(move |connection| {
            connection.transaction::<_, InfrastructureRepositoryError, _>(|transaction| {
                diesel::delete(
                    instance_services::table.filter(instance_services::instance_id.eq(raw_id)),
                )
                .execute(transaction)?;
                let deleted = diesel::delete(
                    infrastructure_instances::table.filter(infrastructure_instances::id.eq(raw_id)),
                )
                .execute(transaction)?;
                if deleted == 0 {
                    return Err(InfrastructureRepositoryError::InstanceNotFound(instance_id));
                }
                Ok(())
            })
        })
        .await
    }
}

#[async_trait]
impl InstanceServiceRepository for PostgresInfrastructureStore {
    async fn insert_service(
        &self,
        service: &InstanceService,
    ) -> InfrastructureRepositoryResult<()> {
        let service_id = service.id();
        let owner = service.instance_id();
        let row = service_to_row(service)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(instance_services::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match (err, owner) {
                    (DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _), _) => {
                        InfrastructureRepositoryError::DuplicateService(service_id)
                    }
                    (
                        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _),
                        Some(instance_id),
                    ) => InfrastructureRepositoryError::InstanceNotFound(instance_id),
                    (other, _) => InfrastructureRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn bind_plugin(
        &self,
        service_id: InstanceServiceId,
        plugin_id: &PluginId,
        management_config: Option<&Value>,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<PluginBindingChange> {
        let plugin = plugin_id.clone();
        let config = management_config.cloned();
        self.run_blocking(move |connection| {
            connection.transaction::<_, InfrastructureRepositoryError, _>(|transaction| {
                let mut service = lock_service(transaction, service_id)?;
                let change = service.assign_plugin(plugin, config, updated_at);
                if change != PluginBindingChange::Unchanged {
                    write_binding(transaction, &service)?;
                }
                Ok(change)
            })
        })
        .await
    }

    async fn unbind_plugin(
        &self,
        service_id: InstanceServiceId,
        updated_at: DateTime<Utc>,
    ) -> InfrastructureRepositoryResult<Option<PluginId>> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, InfrastructureRepositoryError, _>(|transaction| {
                let mut service = lock_service(transaction, service_id)?;
                let previous = service.unassign_plugin(updated_at);
                if previous.is_some() {
                    write_binding(transaction, &service)?;
                }
                Ok(previous)
            })
        })
        .await
    }

    async fn find_service(
        &self,
        service_id: InstanceServiceId,
    ) -> InfrastructureRepositoryResult<Option<InstanceService>> {
        self.run_blocking(move |connection| {
            let row = instance_services::table
                .filter(instance_services::id.eq(service_id.into_inner()))
                .select(ServiceRow::as_select())
                .first::<ServiceRow>(connection)
                .optional()?;
            row.map(row_to_service).transpose()
        })
        .await
    }

    async fn list_services(
        &self,
        instance_id: InstanceId,
    ) -> InfrastructureRepositoryResult<Vec<InstanceService>> {
        self.run_blocking(move |connection| {
            let rows = instance_services::table
                .filter(instance_services::instance_id.eq(instance_id.into_inner()))
                .order((instance_services::name.asc(), instance_services::id.asc()))
                .select(ServiceRow::as_select())
                .load::<ServiceRow>(connection)?;
            rows.into_iter().map(row_to_service).collect()
        })
        .await
    }

    async fn replace_discovered(
        &self,
        instance_id: InstanceId,
        services: &[InstanceService],
    ) -> InfrastructureRepositoryResult<()> {
        let raw_id = instance_id.into_inner();
        let rows = services
            .iter()
            .map(service_to_row)
            .collect::<InfrastructureRepositoryResult<Vec<_>>>()?;

        self.run_blocking(move |connection| {
            connection.transaction::<_, InfrastructureRepositoryError, _>(|transaction| {
                let owner = infrastructure_instances::table
                    .filter(infrastructure_instances::id.eq(raw_id))
                    .select(infrastructure_instances::id)
                    .for_update()
                    .first::<uuid::Uuid>(transaction)
                    .optional()?;
                if owner.is_none() {
                    return Err(InfrastructureRepositoryError::InstanceNotFound(instance_id));
                }

                let kept: Vec<uuid::Uuid> = rows.iter().map(|row| row.id).collect();
                diesel::delete(
                    instance_services::table
                        .filter(instance_services::instance_id.eq(raw_id))
                        .filter(instance_services::origin.eq(ServiceOrigin::Discovered.as_str()))
                        .filter(instance_services::id.ne_all(kept)),
                )
                .execute(transaction)?;

                for row in &rows {
                    diesel::insert_into(instance_services::table)
                        .values(row)
                        .on_conflict(instance_services::id)
                        .do_update()
                        .set((
                            instance_services::status.eq(&row.status),
                            instance_services::service_config.eq(&row.service_config),
                            instance_services::endpoints.eq(&row.endpoints),
                            instance_services::health_check_url.eq(&row.health_check_url),
                            instance_services::last_seen.eq(row.last_seen),
                            instance_services::updated_at.eq(row.updated_at),
                        ))
                        .execute(transaction)?;
                }
                Ok(())
            })
        })
        .await
    }
}

fn lock_instance(
    connection: &mut PgConnection,
    instance_id: InstanceId,
) -> InfrastructureRepositoryResult<InfrastructureInstance> {
    let row = infrastructure_instances::table
        .find(instance_id.into_inner())
        .select(InstanceRow::as_select())
        .for_update()
        .first::<InstanceRow>(connection)
        .optional()?
        .ok_or(InfrastructureRepositoryError::InstanceNotFound(instance_id))?;
    row_to_instance(row)
}

fn lock_service(
    connection: &mut PgConnection,
    service_id: InstanceServiceId,
) -> InfrastructureRepositoryResult<InstanceService> {
    let row = instance_services::table
        .find(service_id.into_inner())
        .select(ServiceRow::as_select())
        .for_update()
        .first::<ServiceRow>(connection)
        .optional()?
        .ok_or(InfrastructureRepositoryError::ServiceNotFound(service_id))?;
    row_to_service(row)
}

fn write_binding(
    connection: &mut PgConnection,
    service: &InstanceService,
) -> InfrastructureRepositoryResult<()> {
    diesel::update(instance_services::table.find(service.id().into_inner()))
        .set((
            instance_services::management_plugin_id
                .eq(service.management_plugin_id().map(|plugin| plugin.as_str().to_owned())),
            instance_services::management_config.eq(service.management_config().cloned()),
            instance_services::updated_at.eq(service.updated_at()),
        ))
        .execute(connection)?;
    Ok(())
}

pub(super) fn instance_to_row(
    instance: &InfrastructureInstance,
) -> InfrastructureRepositoryResult<InstanceRow> {
    let health_status = instance
        .health_status()
        .map(serde_json::to_value)
        .transpose()
        .map_err(InfrastructureRepositoryError::persistence)?;
    let resources = instance
        .resources()
        .map(serde_json::to_value)
        .transpose()
        .map_err(InfrastructureRepositoryError::persistence)?;

    Ok(InstanceRow {
        id: instance.id().into_inner(),
        name: instance.name().to_owned(),
        instance_type: instance.instance_type().as_str().to_owned(),
        host: instance.host().to_owned(),
        port: instance.port().map(i32::from),
        protocol: instance.protocol().map(str::to_owned),
        description: instance.description().map(str::to_owned),
        connection_type: instance.connection_type().as_str().to_owned(),
        connection_config: instance.connection_config().to_value(),
        status: instance.status().as_str().to_owned(),
        last_health_check: instance.last_health_check(),
        health_status,
        os_type: instance.os_type().map(str::to_owned),
        os_version: instance.os_version().map(str::to_owned),
        resources,
        tags: json!(instance.tags()),
        space_id: instance.space_id().map(|space| space.as_str().to_owned()),
        created_by: instance.created_by().map(str::to_owned),
        created_at: instance.created_at(),
        updated_at: instance.updated_at(),
    })
}

pub(super) fn row_to_instance(
    row: InstanceRow,
) -> InfrastructureRepositoryResult<InfrastructureInstance> {
    let InstanceRow {
        id,
        name,
        instance_type,
        host,
        port,
        protocol,
        description,
        connection_type,
        connection_config,
        status,
        last_health_check,
        health_status,
        os_type,
        os_version,
        resources,
        tags,
        space_id,
        created_by,
        created_at,
        updated_at,
    } = row;

    let data = PersistedInstanceData {
        id: InstanceId::from_uuid(id),
        name,
        instance_type: InstanceType::try_from(instance_type.as_str())
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        host,
        port: port
            .map(u16::try_from)
            .transpose()
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        protocol,
        description,
        connection_type: ConnectionType::try_from(connection_type.as_str())
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        connection_config: ConnectionConfig::from_value(connection_config)
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        status: InstanceStatus::try_from(status.as_str())
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        last_health_check,
        health_status: health_status
            .map(serde_json::from_value)
            .transpose()
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        os_type,
        os_version,
        resources: resources
            .map(serde_json::from_value)
            .transpose()
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        tags: serde_json::from_value(tags)
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        space_id: space_id
            .map(SpaceId::new)
            .transpose()
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        created_by,
        created_at,
        updated_at,
    };
    Ok(InfrastructureInstance::from_persisted(data))
}

pub(super) fn service_to_row(
    service: &InstanceService,
) -> InfrastructureRepositoryResult<ServiceRow> {
    Ok(ServiceRow {
        id: service.id().into_inner(),
        instance_id: service.instance_id().map(InstanceId::into_inner),
        space_id: service.space_id().map(|space| space.as_str().to_owned()),
        name: service.name().to_owned(),
        service_type: service.service_type().as_str().to_owned(),
        origin: service.origin().as_str().to_owned(),
        status: service.status().as_str().to_owned(),
        service_config: service.service_config().clone(),
        endpoints: serde_json::to_value(service.endpoints())
            .map_err(InfrastructureRepositoryError::persistence)?,
        health_check_url: service.health_check_url().map(str::to_owned),
        management_plugin_id: service
            .management_plugin_id()
            .map(|plugin| plugin.as_str().to_owned()),
        management_config: service.management_config().cloned(),
        discovered_at: service.discovered_at(),
        last_seen: service.last_seen(),
        created_at: service.created_at(),
        updated_at: service.updated_at(),
    })
}

pub(super) fn row_to_service(row: ServiceRow) -> InfrastructureRepositoryResult<InstanceService> {
    let ServiceRow {
        id,
        instance_id,
        space_id,
        name,
        service_type,
        origin,
        status,
        service_config,
        endpoints,
        health_check_url,
        management_plugin_id,
        management_config,
        discovered_at,
        last_seen,
        created_at,
        updated_at,
    } = row;

    let data = PersistedServiceData {
        id: InstanceServiceId::from_uuid(id),
        instance_id: instance_id.map(InstanceId::from_uuid),
        space_id: space_id
            .map(SpaceId::new)
            .transpose()
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        name,
        service_type: ServiceType::try_from(service_type.as_str())
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        origin: ServiceOrigin::try_from(origin.as_str())
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        status: ServiceStatus::try_from(status.as_str())
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        service_config,
        endpoints: serde_json::from_value(endpoints)
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        health_check_url,
        management_plugin_id: management_plugin_id
            .map(PluginId::new)
            .transpose()
            .map_err(InfrastructureRepositoryError::invalid_persisted_data)?,
        management_config,
        discovered_at,
        last_seen,
        created_at,
        updated_at,
    };
    Ok(InstanceService::from_persisted(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::domain::{
        InstanceSpec, ResourceSnapshot, ServiceEndpoint, ServiceSpec, SystemInfo,
    };
    use mockable::{Clock, DefaultClock};
    use rstest::{fixture, rstest};

    #[fixture]
    fn instance() -> InfrastructureInstance {
        let mut instance = InfrastructureInstance::new(
            InstanceSpec {
                name: String::from("db1"),
                instance_type: InstanceType::Vm,
                host: String::from("10.0.0.5"),
                port: Some(22),
                protocol: Some(String::from("SSH")),
                description: Some(String::from("primary database")),
                connection_type: ConnectionType::Ssh,
                connection_config: ConnectionConfig::from_value(
                    json!({ "username": "root", "password": "hunter2" }),
                )
                .expect("object config"),
                space_id: Some(SpaceId::new("team-a").expect("valid space")),
                created_by: Some(String::from("ops")),
            },
            &DefaultClock,
        )
        .expect("valid instance");
        instance.record_health(
            InstanceHealthSnapshot::new(InstanceStatus::Online, DefaultClock.utc())
                .with_system_info(SystemInfo {
                    os_type: Some(String::from("Linux")),
                    os_version: Some(String::from("5.15.0-91-generic")),
                    resources: Some(ResourceSnapshot {
                        cpu: Some(4),
                        memory: Some(7976),
                        disk: Some(51_200),
                    }),
                }),
        );
        assert!(instance.replace_tags(
            &[String::from("minio"), String::from("postgresql")],
            DefaultClock.utc(),
        ));
        instance
    }

    #[fixture]
    fn service(instance: InfrastructureInstance) -> InstanceService {
        let mut service = InstanceService::manual(
            instance.id(),
            ServiceSpec {
                name: String::from("minio"),
                service_type: ServiceType::DockerContainer,
                service_config: json!({ "image": "minio/minio:latest" }),
                endpoints: vec![
                    ServiceEndpoint::new("localhost", Some(9000), Some(String::from("tcp")))
                        .expect("valid endpoint"),
                ],
                health_check_url: Some(String::from("http://localhost:9000/minio/health/live")),
                management_plugin_id: None,
                space_id: None,
            },
            &DefaultClock,
        )
        .expect("valid service");
        let change = service.assign_plugin(
            PluginId::new("minio-console").expect("valid plugin id"),
            Some(json!({ "bucket": "backups" })),
            DefaultClock.utc(),
        );
        assert_eq!(change, PluginBindingChange::Assigned);
        service
    }

    #[rstest]
    fn instances_survive_the_row_mapping(instance: InfrastructureInstance) {
        let row = instance_to_row(&instance).expect("instance should map to a row");

        assert_eq!(row.port, Some(22));
        assert_eq!(row.status, "online");
        assert_eq!(row.tags, json!(["minio", "postgresql"]));
        assert_eq!(row.connection_config["password"], json!("hunter2"));
        let restored = row_to_instance(row).expect("row should map back");
        assert_eq!(restored, instance);
    }

    #[rstest]
    fn services_survive_the_row_mapping(service: InstanceService) {
        let row = service_to_row(&service).expect("service should map to a row");

        assert_eq!(row.origin, "manual");
        assert_eq!(row.management_plugin_id.as_deref(), Some("minio-console"));
        assert_eq!(
            row.endpoints,
            json!([{ "url": "localhost", "port": 9000, "protocol": "tcp" }])
        );
        let restored = row_to_service(row).expect("row should map back");
        assert_eq!(restored, service);
    }

    #[rstest]
    #[case::unknown_status(|row: &mut InstanceRow| row.status = String::from("sleeping"))]
    #[case::port_out_of_range(|row: &mut InstanceRow| row.port = Some(70_000))]
    #[case::array_config(|row: &mut InstanceRow| row.connection_config = json!(["root"]))]
    #[case::tags_not_strings(|row: &mut InstanceRow| row.tags = json!([1, 2]))]
    #[case::bad_transport(|row: &mut InstanceRow| row.connection_type = String::from("telnet"))]
    fn corrupt_instance_rows_are_reported(
        instance: InfrastructureInstance,
        #[case] corrupt: fn(&mut InstanceRow),
    ) {
        let mut row = instance_to_row(&instance).expect("instance should map to a row");
        corrupt(&mut row);

        let err = row_to_instance(row).expect_err("row should be rejected");

        assert!(matches!(
            err,
            InfrastructureRepositoryError::InvalidPersistedData(_)
        ));
    }

    #[rstest]
    #[case::unknown_origin(|row: &mut ServiceRow| row.origin = String::from("imported"))]
    #[case::endpoints_not_a_list(|row: &mut ServiceRow| row.endpoints = json!({ "url": "x" }))]
    #[case::blank_plugin(|row: &mut ServiceRow| row.management_plugin_id = Some(String::from(" ")))]
    fn corrupt_service_rows_are_reported(
        service: InstanceService,
        #[case] corrupt: fn(&mut ServiceRow),
    ) {
        let mut row = service_to_row(&service).expect("service should map to a row");
        corrupt(&mut row);

        let err = row_to_service(row).expect_err("row should be rejected");

        assert!(matches!(
            err,
            InfrastructureRepositoryError::InvalidPersistedData(_)
        ));
    }
}
