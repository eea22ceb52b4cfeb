//! Health probing and status assignment over scripted transports.

use super::helpers::{
    Fleet, config, docker_spec, fleet, fleet_with_timeouts, plugin, register_ssh,
    script_healthy_host, service_spec,
};
use fleetwright::infrastructure::{
    adapters::connectors::SshConnector,
    domain::{
        ConnectionConfig, ConnectionType, InstanceSpec, InstanceStatus, InstanceType,
        ResourceSnapshot,
    },
    ports::{Connector, InstanceFilter, SshTarget},
};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn healthy_ssh_host_goes_online_with_system_info(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    script_healthy_host(&fleet.ssh);

    let probed = fleet
        .state
        .health
        .probe(instance.id())
        .await
        .expect("probe should succeed");

    assert_eq!(probed.status(), InstanceStatus::Online);
    assert!(probed.last_health_check().is_some());
    assert_eq!(probed.os_type(), Some("Linux"));
    assert_eq!(probed.os_version(), Some("5.15.0-91-generic"));
    assert_eq!(
        probed.resources(),
        Some(&ResourceSnapshot {
            cpu: Some(4),
            memory: Some(7976),
            disk: Some(51_200),
        })
    );
    let snapshot = probed.health_status().expect("snapshot should be recorded");
    assert_eq!(snapshot.status(), InstanceStatus::Online);

    let stored = fleet
        .state
        .registry
        .find_instance(instance.id())
        .await
        .expect("instance should exist");
    assert_eq!(stored.status(), InstanceStatus::Online);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreachable_ssh_host_goes_offline(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    fleet.ssh.set_unreachable(true).expect("script transport");

    let probed = fleet
        .state
        .health
        .probe(instance.id())
        .await
        .expect("an unreachable host is a probe result, not an error");

    assert_eq!(probed.status(), InstanceStatus::Offline);
    assert!(probed.resources().is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unexpected_health_reply_goes_offline(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    fleet
        .ssh
        .reply("echo \"health check\"", "something else\n")
        .expect("script reply");

    let probed = fleet
        .state
        .health
        .probe(instance.id())
        .await
        .expect("probe should succeed");

    assert_eq!(probed.status(), InstanceStatus::Offline);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unsupported_connection_type_goes_error(fleet: Fleet) {
    let spec = InstanceSpec {
        name: String::from("status-page"),
        instance_type: InstanceType::CloudInstance,
        host: String::from("status.example.com"),
        port: Some(443),
        protocol: Some(String::from("https")),
        description: None,
        connection_type: ConnectionType::Http,
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

    let probed = fleet
        .state
        .health
        .probe(instance.id())
        .await
        .expect("probe should succeed");

    assert_eq!(probed.status(), InstanceStatus::Error);
    assert!(
        probed
            .health_status()
            .and_then(|snapshot| snapshot.message())
            .is_some()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_failing_host_does_not_stop_the_sweep(fleet: Fleet) {
    register_ssh(&fleet, "db1").await;
    fleet
        .state
        .registry
        .register_instance(docker_spec("docker1", "127.0.0.1", 1))
        .await
        .expect("registration should succeed");
    script_healthy_host(&fleet.ssh);

    let report = fleet
        .state
        .health
        .probe_all(&InstanceFilter::default())
        .await
        .expect("sweep should succeed");

    assert_eq!(report.probed.len(), 2);
    assert!(report.failures.is_empty());
    assert_eq!(report.count(InstanceStatus::Online), 1);
    assert_eq!(report.count(InstanceStatus::Offline), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn check_health_reports_false_instead_of_failing(fleet: Fleet) {
    fleet.ssh.set_unreachable(true).expect("script transport");
    let credentials = ConnectionConfig::from_value(json!({ "username": "root" }))
        .and_then(|config| config.ssh_credentials())
        .expect("valid credentials");
    let connector = SshConnector::new(
        Arc::new(fleet.ssh.clone()),
        SshTarget::new("10.0.0.5", 22, credentials),
    );

    assert!(!connector.check_health().await);
    assert!(connector.connect().await.is_err());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_slow_probe_keeps_changes_made_while_it_ran(fleet: Fleet) {
    fleet
        .catalog
        .publish(plugin("minio", "minio", Some("minio")))
        .expect("publish plugin");
    let instance = register_ssh(&fleet, "storage1").await;
    script_healthy_host(&fleet.ssh);
    fleet
        .ssh
        .set_open_delay(Duration::from_millis(300))
        .expect("script transport");

    let health = Arc::clone(&fleet.state.health);
    let instance_id = instance.id();
    let probe = tokio::spawn(async move { health.probe(instance_id).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    fleet
        .state
        .registry
        .update_connection(
            instance_id,
            config(json!({ "username": "deploy", "password": "hunter2" })),
        )
        .await
        .expect("connection update should succeed");
    fleet
        .state
        .registry
        .add_service(instance_id, service_spec("minio", Some("minio")))
        .await
        .expect("manual service should be added");

    let probed = probe
        .await
        .expect("probe task should finish")
        .expect("probe should succeed");

    let stored = fleet
        .state
        .registry
        .find_instance(instance_id)
        .await
        .expect("instance should exist");
    for recorded in [&probed, &stored] {
        assert_eq!(recorded.status(), InstanceStatus::Online);
        assert_eq!(recorded.tags(), ["minio"]);
        let credentials = recorded
            .connection_config()
            .ssh_credentials()
            .expect("valid credentials");
        assert_eq!(credentials.username(), "deploy");
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_system_information_is_left_out_of_an_online_probe() {
    let fleet = fleet_with_timeouts(Duration::from_secs(5), Duration::from_millis(300));
    let instance = register_ssh(&fleet, "db1").await;
    script_healthy_host(&fleet.ssh);
    fleet
        .ssh
        .delay_command("df -h /", Duration::from_secs(2))
        .expect("script transport");

    let probed = fleet
        .state
        .health
        .probe(instance.id())
        .await
        .expect("probe should succeed");

    assert_eq!(probed.status(), InstanceStatus::Online);
    assert!(probed.resources().is_none());
    assert!(probed.os_type().is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_health_check_goes_offline() {
    let fleet = fleet_with_timeouts(Duration::from_secs(5), Duration::from_millis(300));
    let instance = register_ssh(&fleet, "db1").await;
    script_healthy_host(&fleet.ssh);
    fleet
        .ssh
        .delay_command("echo \"health check\"", Duration::from_secs(2))
        .expect("script transport");

    let probed = fleet
        .state
        .health
        .probe(instance.id())
        .await
        .expect("probe should succeed");

    assert_eq!(probed.status(), InstanceStatus::Offline);
    let message = probed
        .health_status()
        .and_then(|snapshot| snapshot.message())
        .expect("the timeout should be explained");
    assert!(message.contains("timed out"));
}
