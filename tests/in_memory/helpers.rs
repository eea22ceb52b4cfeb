//! Shared fixtures for in-memory infrastructure integration tests.

use fleetwright::api::{ApiState, ServiceSettings};
use fleetwright::infrastructure::{
    adapters::{
        connectors::TransportConnectorFactory,
        memory::{
            InMemoryInfrastructureStore, InMemoryPluginCatalog, ScriptedSshClient,
            SlugComponentLoader,
        },
    },
    domain::{
        ConnectionConfig, ConnectionType, InfrastructureInstance, InstanceSpec, InstanceType,
        ManagementPlugin, PluginCapabilities, PluginId, ServiceSpec, ServiceType,
    },
};
use rstest::fixture;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// `systemctl` listing command run by the systemd discoverer.
pub const LIST_UNITS: &str = "systemctl list-units --type=service --no-pager --no-legend";

/// `uname -a` output of the scripted host.
pub const UNAME: &str =
    "Linux db1 5.15.0-91-generic #101-Ubuntu SMP Tue Nov 14 13:30:08 UTC 2023 x86_64 GNU/Linux";

/// `free -m` output of the scripted host.
pub const FREE: &str = "               total        used        free      shared  buff/cache   available
Mem:            7976        2103        3121          12        2751        5566
Swap:           2047           0        2047";

/// `df -h /` output of the scripted host.
pub const DF: &str = "Filesystem      Size  Used Avail Use% Mounted on
/dev/sda1        50G   12G   36G  25% /";

/// Service graph over in-memory adapters and a scripted SSH transport.
pub struct Fleet {
    /// Scripted transport shared with every SSH connector.
    pub ssh: ScriptedSshClient,
    /// Plugin catalog; plugins published here are visible to the services.
    pub catalog: InMemoryPluginCatalog,
    /// Wired services.
    pub state: ApiState,
}

/// Provides a fresh service graph for each test.
#[fixture]
pub fn fleet() -> Fleet {
    fleet_with_timeouts(Duration::from_secs(5), Duration::from_secs(5))
}

/// Builds a service graph with explicit sweep and probe deadlines.
#[must_use]
pub fn fleet_with_timeouts(sweep_timeout: Duration, probe_timeout: Duration) -> Fleet {
    let ssh = ScriptedSshClient::new();
    let catalog = InMemoryPluginCatalog::default();
    let factory = TransportConnectorFactory::new(Arc::new(ssh.clone()), Duration::from_secs(2))
        .expect("http client should build");
    let settings = ServiceSettings {
        sweep_timeout,
        probe_timeout,
        ..ServiceSettings::default()
    };
    let state = ApiState::new(
        Arc::new(InMemoryInfrastructureStore::new()),
        Arc::new(factory),
        Arc::new(catalog.clone()),
        Arc::new(SlugComponentLoader::new("/plugins")),
        settings,
    );
    Fleet {
        ssh,
        catalog,
        state,
    }
}

/// Wraps a JSON object as a connection configuration.
#[must_use]
pub fn config(value: Value) -> ConnectionConfig {
    ConnectionConfig::from_value(value).expect("connection config should be an object")
}

/// Builds the spec of a VM reachable over SSH as `root`.
#[must_use]
pub fn ssh_spec(name: &str) -> InstanceSpec {
    InstanceSpec {
        name: name.to_owned(),
        instance_type: InstanceType::Vm,
        host: String::from("10.0.0.5"),
        port: Some(22),
        protocol: None,
        description: None,
        connection_type: ConnectionType::Ssh,
        connection_config: config(json!({ "username": "root", "password": "hunter2" })),
        space_id: None,
        created_by: None,
    }
}

/// Builds the spec of a Docker host serving the Engine API on `host:port`.
#[must_use]
pub fn docker_spec(name: &str, host: &str, port: u16) -> InstanceSpec {
    InstanceSpec {
        name: name.to_owned(),
        instance_type: InstanceType::DockerHost,
        host: host.to_owned(),
        port: Some(port),
        protocol: Some(String::from("http")),
        description: None,
        connection_type: ConnectionType::DockerApi,
        connection_config: config(json!({})),
        space_id: None,
        created_by: None,
    }
}

/// Builds the spec of a manual service.
#[must_use]
pub fn service_spec(name: &str, plugin: Option<&str>) -> ServiceSpec {
    ServiceSpec {
        name: name.to_owned(),
        service_type: ServiceType::Application,
        service_config: json!({}),
        endpoints: Vec::new(),
        health_check_url: None,
        management_plugin_id: plugin.map(|id| PluginId::new(id).expect("valid plugin id")),
        space_id: None,
    }
}

/// Builds plugin metadata declaring `service_type`.
#[must_use]
pub fn plugin(id: &str, slug: &str, service_type: Option<&str>) -> ManagementPlugin {
    ManagementPlugin::new(
        PluginId::new(id).expect("valid plugin id"),
        slug,
        slug,
        PluginCapabilities {
            service_type: service_type.map(str::to_owned),
        },
    )
}

/// Registers an SSH instance through the registry.
pub async fn register_ssh(fleet: &Fleet, name: &str) -> InfrastructureInstance {
    fleet
        .state
        .registry
        .register_instance(ssh_spec(name))
        .await
        .expect("registration should succeed")
}

/// Scripts a healthy host answering the system information commands.
pub fn script_healthy_host(ssh: &ScriptedSshClient) {
    for (command, reply) in [
        ("echo \"health check\"", "health check\n"),
        ("uname -a", UNAME),
        ("nproc", "4\n"),
        ("free -m", FREE),
        ("df -h /", DF),
    ] {
        ssh.reply(command, reply).expect("script reply");
    }
}

/// Scripts the systemd unit listing, one `(unit, active)` pair per row.
pub fn script_units(ssh: &ScriptedSshClient, units: &[(&str, &str)]) {
    let listing = units
        .iter()
        .map(|(unit, active)| {
            let sub = if *active == "active" { "running" } else { "dead" };
            format!("{unit} loaded {active} {sub} {unit} daemon")
        })
        .collect::<Vec<_>>()
        .join("\n");
    ssh.reply(LIST_UNITS, &listing).expect("script listing");
}
