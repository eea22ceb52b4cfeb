//! Discovery sweeps over systemd hosts reached through scripted SSH.

use super::helpers::{
    Fleet, docker_spec, fleet, plugin, register_ssh, script_units, service_spec,
};
use fleetwright::infrastructure::{
    domain::{
        ConnectionConfig, ConnectionType, InstanceService, InstanceSpec, InstanceType, PluginId,
        ServiceOrigin, ServiceStatus, ServiceType,
    },
    ports::{DiscoveryError, InstanceFilter},
    services::InfrastructureServiceError,
};
use rstest::rstest;
use serde_json::json;

fn names(services: &[InstanceService]) -> Vec<&str> {
    let mut listed: Vec<&str> = services.iter().map(InstanceService::name).collect();
    listed.sort_unstable();
    listed
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_records_systemd_units(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    script_units(
        &fleet.ssh,
        &[("nginx.service", "active"), ("cron.service", "inactive")],
    );
    fleet
        .ssh
        .reply(
            "systemctl show 'nginx.service' --property=ActiveState,MainPID,ExecStart",
            "ActiveState=active\nMainPID=812\n",
        )
        .expect("script reply");

    let services = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("sweep should succeed");

    assert_eq!(names(&services), ["cron.service", "nginx.service"]);
    let nginx = services
        .iter()
        .find(|service| service.name() == "nginx.service")
        .expect("nginx should be discovered");
    assert_eq!(nginx.service_type(), ServiceType::SystemdService);
    assert_eq!(nginx.origin(), ServiceOrigin::Discovered);
    assert_eq!(nginx.status(), ServiceStatus::Running);
    assert_eq!(
        nginx.service_config().get("details"),
        Some(&json!("ActiveState=active\nMainPID=812\n"))
    );
    let cron = services
        .iter()
        .find(|service| service.name() == "cron.service")
        .expect("cron should be discovered");
    assert_eq!(cron.status(), ServiceStatus::Stopped);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_sweeps_keep_service_identity(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    script_units(&fleet.ssh, &[("nginx.service", "active")]);

    let first = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("first sweep should succeed");
    let second = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("second sweep should succeed");

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    let (before, after) = (first.first(), second.first());
    assert_eq!(before.map(InstanceService::id), after.map(InstanceService::id));
    assert_eq!(
        before.map(InstanceService::discovered_at),
        after.map(InstanceService::discovered_at)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_sweep_leaves_services_untouched(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    script_units(&fleet.ssh, &[("nginx.service", "active")]);
    fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("first sweep should succeed");

    fleet.ssh.set_unreachable(true).expect("script transport");
    let err = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect_err("sweep over an unreachable host should fail");
    assert!(matches!(err, InfrastructureServiceError::Discovery(_)));

    let services = fleet
        .state
        .registry
        .list_services(instance.id())
        .await
        .expect("listing should succeed");
    assert_eq!(names(&services), ["nginx.service"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn vanished_units_are_removed_but_manual_services_stay(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("billing", None))
        .await
        .expect("manual service should be added");
    script_units(
        &fleet.ssh,
        &[("nginx.service", "active"), ("redis.service", "active")],
    );
    fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("first sweep should succeed");

    script_units(&fleet.ssh, &[("nginx.service", "active")]);
    let services = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("second sweep should succeed");

    assert_eq!(names(&services), ["billing", "nginx.service"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plugin_bindings_survive_a_sweep(fleet: Fleet) {
    fleet
        .catalog
        .publish(plugin("nginx-manager", "nginx", Some("nginx")))
        .expect("publish plugin");
    let instance = register_ssh(&fleet, "web1").await;
    script_units(&fleet.ssh, &[("nginx.service", "active")]);
    let discovered = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("sweep should succeed");
    let nginx = discovered.first().expect("one service");
    let plugin_id = PluginId::new("nginx-manager").expect("valid plugin id");
    fleet
        .state
        .bindings
        .assign(nginx.id(), plugin_id.clone(), Some(json!({ "reload": true })))
        .await
        .expect("assignment should succeed");

    let services = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("re-sweep should succeed");

    let swept = services.first().expect("one service");
    assert_eq!(swept.management_plugin_id(), Some(&plugin_id));
    assert_eq!(swept.management_config(), Some(&json!({ "reload": true })));
    let tags = fleet
        .state
        .tags
        .tags(instance.id())
        .await
        .expect("tags should resolve");
    assert_eq!(tags, ["nginx"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_host_yields_no_services(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    script_units(&fleet.ssh, &[]);

    let services = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect("sweep should succeed");

    assert!(services.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn kubernetes_discovery_is_unsupported(fleet: Fleet) {
    let spec = InstanceSpec {
        name: String::from("cluster"),
        instance_type: InstanceType::Kubernetes,
        host: String::from("k8s.internal"),
        port: None,
        protocol: None,
        description: None,
        connection_type: ConnectionType::Kubernetes,
        connection_config: ConnectionConfig::default(),
        space_id: None,
        created_by: None,
    };
    let instance = fleet
        .state
        .registry
        .register_instance(spec)
        .await
        .expect("registration should succeed");

    let err = fleet
        .state
        .discovery
        .discover(instance.id())
        .await
        .expect_err("kubernetes sweeps are not implemented");

    assert!(matches!(
        err,
        InfrastructureServiceError::Discovery(DiscoveryError::Unsupported(
            ConnectionType::Kubernetes
        ))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_all_isolates_failures(fleet: Fleet) {
    let reachable = register_ssh(&fleet, "db1").await;
    script_units(&fleet.ssh, &[("nginx.service", "active")]);
    let unreachable = fleet
        .state
        .registry
        .register_instance(docker_spec("docker1", "127.0.0.1", 1))
        .await
        .expect("registration should succeed");

    let report = fleet
        .state
        .discovery
        .discover_all(&InstanceFilter::default())
        .await
        .expect("sweep should complete");

    assert_eq!(report.swept, [(reachable.id(), 1)]);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed.iter().all(|(id, _)| *id == unreachable.id()));
}
