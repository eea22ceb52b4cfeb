//! Registry behaviour: registration, filtering and cascading deletes.

use super::helpers::{Fleet, fleet, register_ssh, service_spec, ssh_spec};
use fleetwright::infrastructure::{
    domain::{InstanceId, InstanceStatus, ServiceOrigin, SpaceId},
    ports::InstanceFilter,
    services::InfrastructureServiceError,
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn new_instances_start_unknown_without_tags(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;

    assert_eq!(instance.status(), InstanceStatus::Unknown);
    assert!(instance.tags().is_empty());
    assert!(instance.last_health_check().is_none());

    let services = fleet
        .state
        .registry
        .list_services(instance.id())
        .await
        .expect("listing should succeed");
    assert!(services.is_empty());
    let tags = fleet
        .state
        .tags
        .tags(instance.id())
        .await
        .expect("tags should resolve");
    assert!(tags.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn names_are_unique_within_a_space(fleet: Fleet) {
    register_ssh(&fleet, "db1").await;

    let err = fleet
        .state
        .registry
        .register_instance(ssh_spec("db1"))
        .await
        .expect_err("a second db1 in the same space should be rejected");
    assert!(matches!(err, InfrastructureServiceError::Repository(_)));

    let mut scoped = ssh_spec("db1");
    scoped.space_id = Some(SpaceId::new("team-a").expect("valid space"));
    fleet
        .state
        .registry
        .register_instance(scoped)
        .await
        .expect("the same name in another space is allowed");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_filters_by_space(fleet: Fleet) {
    register_ssh(&fleet, "shared").await;
    let mut scoped = ssh_spec("scoped");
    scoped.space_id = Some(SpaceId::new("team-a").expect("valid space"));
    fleet
        .state
        .registry
        .register_instance(scoped)
        .await
        .expect("registration should succeed");

    let filter = InstanceFilter {
        space_id: Some(SpaceId::new("team-a").expect("valid space")),
        ..InstanceFilter::default()
    };
    let listed = fleet
        .state
        .registry
        .list_instances(&filter)
        .await
        .expect("listing should succeed");

    let names: Vec<&str> = listed.iter().map(|instance| instance.name()).collect();
    assert_eq!(names, ["scoped"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_an_instance_removes_its_services(fleet: Fleet) {
    let instance = register_ssh(&fleet, "db1").await;
    let service = fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("billing", None))
        .await
        .expect("manual service should be added");
    assert_eq!(service.origin(), ServiceOrigin::Manual);

    fleet
        .state
        .registry
        .delete_instance(instance.id())
        .await
        .expect("delete should succeed");

    let lookup = fleet.state.registry.find_service(service.id()).await;
    assert!(matches!(
        lookup,
        Err(InfrastructureServiceError::ServiceNotFound(id)) if id == service.id()
    ));
    let instance_lookup = fleet.state.registry.find_instance(instance.id()).await;
    assert!(instance_lookup.is_err_and(|err| err.is_not_found()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn services_of_unknown_instances_are_not_found(fleet: Fleet) {
    let missing = InstanceId::new();

    let err = fleet
        .state
        .registry
        .list_services(missing)
        .await
        .expect_err("unknown instance");

    assert!(matches!(err, InfrastructureServiceError::InstanceNotFound(id) if id == missing));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_services_belong_to_no_instance(fleet: Fleet) {
    let mut spec = service_spec("managed-postgres", None);
    spec.space_id = Some(SpaceId::new("team-a").expect("valid space"));

    let service = fleet
        .state
        .registry
        .register_remote_service(spec)
        .await
        .expect("remote registration should succeed");

    assert_eq!(service.origin(), ServiceOrigin::Remote);
    assert!(service.instance_id().is_none());
    let found = fleet
        .state
        .registry
        .find_service(service.id())
        .await
        .expect("remote service should be stored");
    assert_eq!(found.name(), "managed-postgres");
}
