//! Plugin bindings, derived tags and component resolution.

use super::helpers::{Fleet, fleet, plugin, register_ssh, service_spec};
use fleetwright::infrastructure::{
    domain::{PluginBindingChange, PluginCompatibility, PluginId},
    ports::InstanceFilter,
    services::InfrastructureServiceError,
};
use rstest::rstest;
use serde_json::json;

fn minio() -> PluginId {
    PluginId::new("minio-console").expect("valid plugin id")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn binding_a_plugin_adds_its_tag_and_unbinding_removes_it(fleet: Fleet) {
    fleet
        .catalog
        .publish(plugin("minio-console", "minio-console", Some("minio")))
        .expect("publish plugin");
    let instance = register_ssh(&fleet, "storage1").await;
    let service = fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("minio", None))
        .await
        .expect("manual service should be added");

    let outcome = fleet
        .state
        .bindings
        .assign(service.id(), minio(), None)
        .await
        .expect("assignment should succeed");
    assert_eq!(outcome.change, PluginBindingChange::Assigned);
    assert_eq!(outcome.compatibility, PluginCompatibility::Compatible);
    let tagged = fleet
        .state
        .registry
        .find_instance(instance.id())
        .await
        .expect("instance should exist");
    assert_eq!(tagged.tags(), ["minio"]);

    let previous = fleet
        .state
        .bindings
        .unassign(service.id())
        .await
        .expect("unassignment should succeed");
    assert_eq!(previous, Some(minio()));
    let untagged = fleet
        .state
        .registry
        .find_instance(instance.id())
        .await
        .expect("instance should exist");
    assert!(untagged.tags().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_by_tag_follows_bindings(fleet: Fleet) {
    fleet
        .catalog
        .publish(plugin("minio-console", "minio-console", Some("minio")))
        .expect("publish plugin");
    let storage = register_ssh(&fleet, "storage1").await;
    register_ssh(&fleet, "web1").await;
    let service = fleet
        .state
        .registry
        .add_service(storage.id(), service_spec("minio", None))
        .await
        .expect("manual service should be added");
    let by_tag = InstanceFilter {
        tag: Some(String::from("minio")),
        ..InstanceFilter::default()
    };

    fleet
        .state
        .bindings
        .assign(service.id(), minio(), None)
        .await
        .expect("assignment should succeed");
    let tagged = fleet
        .state
        .registry
        .list_instances(&by_tag)
        .await
        .expect("listing should succeed");
    let names: Vec<&str> = tagged.iter().map(|instance| instance.name()).collect();
    assert_eq!(names, ["storage1"]);

    fleet
        .state
        .bindings
        .unassign(service.id())
        .await
        .expect("unassignment should succeed");
    let untagged = fleet
        .state
        .registry
        .list_instances(&by_tag)
        .await
        .expect("listing should succeed");
    assert!(untagged.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_tag_stays_while_another_service_grants_it(fleet: Fleet) {
    fleet
        .catalog
        .publish(plugin("minio-console", "minio-console", Some("minio")))
        .expect("publish plugin");
    let instance = register_ssh(&fleet, "storage1").await;
    let first = fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("minio-a", Some("minio-console")))
        .await
        .expect("manual service should be added");
    fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("minio-b", Some("minio-console")))
        .await
        .expect("manual service should be added");

    fleet
        .state
        .bindings
        .unassign(first.id())
        .await
        .expect("unassignment should succeed");

    let tags = fleet
        .state
        .tags
        .tags(instance.id())
        .await
        .expect("tags should resolve");
    assert_eq!(tags, ["minio"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rebinding_the_same_plugin_changes_nothing(fleet: Fleet) {
    fleet
        .catalog
        .publish(plugin("minio-console", "minio-console", Some("minio")))
        .expect("publish plugin");
    let instance = register_ssh(&fleet, "storage1").await;
    let service = fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("minio", None))
        .await
        .expect("manual service should be added");
    fleet
        .state
        .bindings
        .assign(service.id(), minio(), Some(json!({ "bucket": "backups" })))
        .await
        .expect("assignment should succeed");
    let bound = fleet
        .state
        .registry
        .find_service(service.id())
        .await
        .expect("service should exist");

    let outcome = fleet
        .state
        .bindings
        .assign(service.id(), minio(), Some(json!({ "bucket": "other" })))
        .await
        .expect("repeat assignment should succeed");

    assert_eq!(outcome.change, PluginBindingChange::Unchanged);
    let after = fleet
        .state
        .registry
        .find_service(service.id())
        .await
        .expect("service should exist");
    assert_eq!(after.management_config(), Some(&json!({ "bucket": "backups" })));
    assert_eq!(after.updated_at(), bound.updated_at());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mismatched_plugins_are_bound_with_a_warning(fleet: Fleet) {
    fleet
        .catalog
        .publish(plugin("kong-manager", "kong-manager", Some("kong")))
        .expect("publish plugin");
    let instance = register_ssh(&fleet, "storage1").await;
    let service = fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("minio", None))
        .await
        .expect("manual service should be added");

    let outcome = fleet
        .state
        .bindings
        .assign(
            service.id(),
            PluginId::new("kong-manager").expect("valid plugin id"),
            None,
        )
        .await
        .expect("assignment should succeed");

    assert_eq!(outcome.compatibility, PluginCompatibility::Mismatch);
    assert_eq!(outcome.change, PluginBindingChange::Assigned);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_plugins_are_rejected(fleet: Fleet) {
    let instance = register_ssh(&fleet, "storage1").await;
    let service = fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("minio", None))
        .await
        .expect("manual service should be added");

    let err = fleet
        .state
        .bindings
        .assign(service.id(), minio(), None)
        .await
        .expect_err("the catalog has no such plugin");

    assert!(matches!(err, InfrastructureServiceError::PluginNotFound(ref id) if *id == minio()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn components_resolve_only_for_bound_services(fleet: Fleet) {
    fleet
        .catalog
        .publish(plugin("minio-console", "minio-console", Some("minio")))
        .expect("publish plugin");
    let instance = register_ssh(&fleet, "storage1").await;
    let service = fleet
        .state
        .registry
        .add_service(instance.id(), service_spec("minio", None))
        .await
        .expect("manual service should be added");

    let unbound = fleet
        .state
        .bindings
        .load_component(service.id())
        .await
        .expect("lookup should succeed");
    assert!(unbound.is_none());

    fleet
        .state
        .bindings
        .assign(service.id(), minio(), None)
        .await
        .expect("assignment should succeed");
    let component = fleet
        .state
        .bindings
        .load_component(service.id())
        .await
        .expect("lookup should succeed")
        .expect("bound services have a component");

    assert_eq!(component.entry_point, "/plugins/minio-console/component.js");
    assert_eq!(component.props.get("serviceName"), Some(&json!("minio")));
}
