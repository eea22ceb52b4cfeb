//! Container discovery through the Docker Engine API.

use crate::infrastructure::{
    adapters::connectors::DockerApiClient,
    domain::{DiscoveredService, ServiceEndpoint, ServiceStatus, ServiceType},
    ports::{DiscoveryResult, ServiceDiscoverer},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const SHORT_ID_LEN: usize = 12;
const FALLBACK_ENDPOINT_HOST: &str = "localhost";

/// Discovers containers, running or not, on a Docker host.
#[derive(Debug, Clone)]
pub struct DockerDiscoverer {
    client: DockerApiClient,
}

impl DockerDiscoverer {
    /// Creates a discoverer over an API client.
    #[must_use]
    pub const fn new(client: DockerApiClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerSummary {
    id: String,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    image: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    status: String,
}

impl ContainerSummary {
    fn display_name(&self) -> String {
        self.names
            .first()
            .map(|name| name.trim_start_matches('/'))
            .filter(|name| !name.is_empty())
            .map_or_else(
                || self.id.chars().take(SHORT_ID_LEN).collect(),
                str::to_owned,
            )
    }

    fn runtime_status(&self) -> ServiceStatus {
        if self.status.contains("Up") {
            ServiceStatus::Running
        } else {
            ServiceStatus::Stopped
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerDetail {
    #[serde(default)]
    config: Option<ContainerConfig>,
    #[serde(default)]
    network_settings: Option<NetworkSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerConfig {
    #[serde(default)]
    env: Option<Vec<String>>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkSettings {
    #[serde(default)]
    ports: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PortBinding {
    #[serde(default)]
    host_ip: Option<String>,
    #[serde(default)]
    host_port: Option<String>,
}

/// Maps the `NetworkSettings.Ports` table to endpoints in port-key order.
///
/// Each host binding yields one endpoint; a port without bindings yields a
/// `localhost` endpoint on the container port.
fn endpoints_from_ports(
    ports: &BTreeMap<String, Option<Vec<PortBinding>>>,
) -> Vec<ServiceEndpoint> {
    let mut endpoints = Vec::new();
    for (key, bindings) in ports {
        let (container_port, protocol) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
        let protocol = Some(protocol.to_owned());
        match bindings.as_deref() {
            Some(bound) if !bound.is_empty() => {
                endpoints.extend(bound.iter().map(|binding| ServiceEndpoint {
                    url: binding
                        .host_ip
                        .as_deref()
                        .filter(|ip| !ip.is_empty())
                        .unwrap_or(FALLBACK_ENDPOINT_HOST)
                        .to_owned(),
                    port: binding
                        .host_port
                        .as_deref()
                        .and_then(|port| port.parse().ok()),
                    protocol: protocol.clone(),
                }));
            }
            _ => endpoints.push(ServiceEndpoint {
                url: FALLBACK_ENDPOINT_HOST.to_owned(),
                port: container_port.parse().ok(),
                protocol,
            }),
        }
    }
    endpoints
}

fn normalize(summary: &ContainerSummary, detail: Option<ContainerDetail>) -> DiscoveredService {
    let mut service_config = json!({
        "image": summary.image,
        "containerId": summary.id,
        "state": summary.state,
        "status": summary.status,
    });

    let Some(detail) = detail else {
        return DiscoveredService {
            name: summary.display_name(),
            service_type: ServiceType::DockerContainer,
            status: ServiceStatus::Error,
            service_config,
            endpoints: Vec::new(),
            health_check_url: None,
        };
    };

    let config = detail.config.unwrap_or_default();
    let ports = detail
        .network_settings
        .and_then(|settings| settings.ports)
        .unwrap_or_default();
    if let Some(object) = service_config.as_object_mut() {
        object.insert(String::from("env"), json!(config.env.unwrap_or_default()));
        object.insert(
            String::from("labels"),
            json!(config.labels.unwrap_or_default()),
        );
        object.insert(String::from("ports"), json!(ports));
    }

    DiscoveredService {
        name: summary.display_name(),
        service_type: ServiceType::DockerContainer,
        status: summary.runtime_status(),
        service_config,
        endpoints: endpoints_from_ports(&ports),
        health_check_url: None,
    }
}

#[async_trait]
impl ServiceDiscoverer for DockerDiscoverer {
    async fn try_discover(&self) -> DiscoveryResult<Vec<DiscoveredService>> {
        let containers: Vec<ContainerSummary> =
            self.client.get_json("/containers/json?all=true").await?;
        debug!(
            endpoint = %self.client.describe(),
            count = containers.len(),
            "listed docker containers"
        );

        let mut services = Vec::with_capacity(containers.len());
        for container in &containers {
            let path = format!("/containers/{}/json", container.id);
            let detail = match self.client.get_json::<ContainerDetail>(&path).await {
                Ok(detail) => Some(detail),
                Err(err) => {
                    warn!(container_id = %container.id, error = %err, "container inspect failed");
                    None
                }
            };
            services.push(normalize(container, detail));
        }
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn summary(names: Value, status: &str) -> ContainerSummary {
        serde_json::from_value(json!({
            "Id": "4f66ad9a0b2e1c3d5e7f",
            "Names": names,
            "Image": "nginx:1.27",
            "State": "running",
            "Status": status,
        }))
        .expect("valid summary")
    }

    #[test]
    fn name_strips_leading_slash() {
        assert_eq!(summary(json!(["/web"]), "Up 2 hours").display_name(), "web");
    }

    #[test]
    fn missing_name_falls_back_to_short_id() {
        assert_eq!(summary(json!([]), "Exited (0)").display_name(), "4f66ad9a0b2e");
    }

    #[test]
    fn status_without_up_is_stopped() {
        assert_eq!(
            summary(json!(["/job"]), "Exited (1) 3 minutes ago").runtime_status(),
            ServiceStatus::Stopped
        );
    }

    #[test]
    fn bound_and_unbound_ports_become_endpoints() {
        let ports: BTreeMap<String, Option<Vec<PortBinding>>> = serde_json::from_value(json!({
            "80/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}],
            "9000/udp": null
        }))
        .expect("valid ports");

        let endpoints = endpoints_from_ports(&ports);

        assert_eq!(
            endpoints,
            vec![
                ServiceEndpoint {
                    url: String::from("0.0.0.0"),
                    port: Some(8080),
                    protocol: Some(String::from("tcp")),
                },
                ServiceEndpoint {
                    url: String::from("localhost"),
                    port: Some(9000),
                    protocol: Some(String::from("udp")),
                },
            ]
        );
    }

    #[test]
    fn failed_inspect_yields_error_status_without_endpoints() {
        let service = normalize(&summary(json!(["/web"]), "Up 2 hours"), None);

        assert_eq!(service.status, ServiceStatus::Error);
        assert!(service.endpoints.is_empty());
        assert_eq!(service.service_config["image"], "nginx:1.27");
    }
}
