//! Diesel schema for infrastructure persistence.

diesel::table! {
    /// Registered infrastructure instances.
    infrastructure_instances (id) {
        /// Instance identifier.
        id -> Uuid,
        /// Display name, unique within a space.
        #[max_length = 255]
        name -> Varchar,
        /// Instance type (`vm`, `docker_host`, `kubernetes`, `cloud_instance`).
        #[max_length = 50]
        instance_type -> Varchar,
        /// Host name or address.
        #[max_length = 255]
        host -> Varchar,
        /// Optional port.
        port -> Nullable<Int4>,
        /// Optional protocol hint.
        #[max_length = 20]
        protocol -> Nullable<Varchar>,
        /// Optional description.
        description -> Nullable<Text>,
        /// Connection type (`ssh`, `docker_api`, `kubernetes`, `http`).
        #[max_length = 50]
        connection_type -> Varchar,
        /// Connection configuration object.
        connection_config -> Jsonb,
        /// Status (`online`, `offline`, `error`, `unknown`).
        #[max_length = 50]
        status -> Varchar,
        /// Timestamp of the last health probe.
        last_health_check -> Nullable<Timestamptz>,
        /// Last health snapshot.
        health_status -> Nullable<Jsonb>,
        /// Operating system family.
        #[max_length = 100]
        os_type -> Nullable<Varchar>,
        /// Operating system version.
        #[max_length = 255]
        os_version -> Nullable<Varchar>,
        /// Resource snapshot.
        resources -> Nullable<Jsonb>,
        /// Derived capability tags as a JSON array.
        tags -> Jsonb,
        /// Tenant scope.
        #[max_length = 255]
        space_id -> Nullable<Varchar>,
        /// Registering user.
        #[max_length = 255]
        created_by -> Nullable<Varchar>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Services running on, or bound to, instances.
    instance_services (id) {
        /// Service identifier.
        id -> Uuid,
        /// Owning instance; null for remote services.
        instance_id -> Nullable<Uuid>,
        /// Tenant scope of remote services.
        #[max_length = 255]
        space_id -> Nullable<Varchar>,
        /// Service name.
        #[max_length = 255]
        name -> Varchar,
        /// Service type (`docker_container`, `systemd_service`, `application`).
        #[max_length = 50]
        service_type -> Varchar,
        /// Origin (`discovered`, `manual`, `remote`).
        #[max_length = 20]
        origin -> Varchar,
        /// Status (`running`, `stopped`, `error`, `unknown`).
        #[max_length = 50]
        status -> Varchar,
        /// Connector-specific payload.
        service_config -> Jsonb,
        /// Endpoints as a JSON array.
        endpoints -> Jsonb,
        /// Health check URL.
        health_check_url -> Nullable<Text>,
        /// Bound management plugin.
        #[max_length = 255]
        management_plugin_id -> Nullable<Varchar>,
        /// Plugin-specific configuration.
        management_config -> Nullable<Jsonb>,
        /// First discovery timestamp.
        discovered_at -> Timestamptz,
        /// Last sighting timestamp.
        last_seen -> Timestamptz,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(instance_services -> infrastructure_instances (instance_id));
diesel::allow_tables_to_appear_in_same_query!(infrastructure_instances, instance_services);
