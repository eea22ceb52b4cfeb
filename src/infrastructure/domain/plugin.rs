//! Management plugin metadata as reported by the marketplace.

use super::{InstanceService, PluginBindingChange, PluginId, canonical_tag};
use serde::{Deserialize, Serialize};

/// Capabilities a management plugin declares.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginCapabilities {
    /// Kind of service the plugin manages, e.g. `minio`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
}

/// Externally distributed plugin that can manage a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementPlugin {
    id: PluginId,
    slug: String,
    name: String,
    #[serde(default)]
    capabilities: PluginCapabilities,
}

impl ManagementPlugin {
    /// Creates plugin metadata.
    #[must_use]
    pub fn new(
        id: PluginId,
        slug: impl Into<String>,
        name: impl Into<String>,
        capabilities: PluginCapabilities,
    ) -> Self {
        Self {
            id,
            slug: slug.into(),
            name: name.into(),
            capabilities,
        }
    }

    /// Returns the marketplace identifier.
    #[must_use]
    pub const fn id(&self) -> &PluginId {
        &self.id
    }

    /// Returns the marketplace slug.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> &PluginCapabilities {
        &self.capabilities
    }

    /// Returns the capability tag this plugin grants.
    ///
    /// The declared service type wins; the slug is the fallback.
    #[must_use]
    pub fn canonical_tag(&self) -> Option<String> {
        self.capabilities
            .service_type
            .as_deref()
            .and_then(canonical_tag)
            .or_else(|| canonical_tag(&self.slug))
    }

    /// Checks the declared service type against a service.
    ///
    /// The check is advisory: binding proceeds whatever the result.
    #[must_use]
    pub fn compatibility_with(&self, service: &InstanceService) -> PluginCompatibility {
        let Some(declared) = self
            .capabilities
            .service_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            return PluginCompatibility::Undeclared;
        };
        let needle = declared.to_ascii_lowercase();

        let image = service
            .service_config()
            .get("image")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let haystacks = [
            service.service_type().as_str().to_owned(),
            service.name().to_ascii_lowercase(),
            image,
        ];

        if haystacks.iter().any(|candidate| candidate.contains(&needle)) {
            PluginCompatibility::Compatible
        } else {
            PluginCompatibility::Mismatch
        }
    }
}

/// Advisory result of matching a plugin against a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCompatibility {
    /// The service type, name or image mentions the declared service type.
    Compatible,
    /// The plugin declares a service type the service does not mention.
    Mismatch,
    /// The plugin declares no service type.
    Undeclared,
}

/// Result of binding a plugin to a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignOutcome {
    /// How the binding changed.
    pub change: PluginBindingChange,
    /// Advisory compatibility verdict.
    pub compatibility: PluginCompatibility,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::domain::{
        DiscoveredService, InstanceId, ServiceStatus, ServiceType,
    };
    use mockable::DefaultClock;
    use serde_json::json;

    fn plugin(slug: &str, service_type: Option<&str>) -> ManagementPlugin {
        ManagementPlugin::new(
            PluginId::new(format!("plg-{slug}")).expect("valid plugin id"),
            slug,
            slug,
            PluginCapabilities {
                service_type: service_type.map(str::to_owned),
            },
        )
    }

    fn container(name: &str, image: &str) -> InstanceService {
        InstanceService::from_discovery(
            InstanceId::new(),
            DiscoveredService {
                name: name.to_owned(),
                service_type: ServiceType::DockerContainer,
                status: ServiceStatus::Running,
                service_config: json!({"image": image}),
                endpoints: Vec::new(),
                health_check_url: None,
            },
            &DefaultClock,
        )
        .expect("valid service")
    }

    #[test]
    fn service_type_wins_over_slug() {
        let candidate = plugin("object-store-plugin", Some("MinIO"));
        assert_eq!(candidate.canonical_tag().as_deref(), Some("minio"));
    }

    #[test]
    fn slug_is_used_without_service_type() {
        let candidate = plugin("grafana-manager", None);
        assert_eq!(candidate.canonical_tag().as_deref(), Some("grafana"));
    }

    #[test]
    fn image_match_counts_as_compatible() {
        let candidate = plugin("minio", Some("minio"));
        let service = container("storage", "quay.io/minio/minio:latest");
        assert_eq!(
            candidate.compatibility_with(&service),
            PluginCompatibility::Compatible
        );
    }

    #[test]
    fn unrelated_service_is_a_mismatch() {
        let candidate = plugin("kong", Some("kong"));
        let service = container("web", "nginx:1.27");
        assert_eq!(
            candidate.compatibility_with(&service),
            PluginCompatibility::Mismatch
        );
    }

    #[test]
    fn plugin_metadata_deserializes_from_camel_case() {
        let parsed: ManagementPlugin = serde_json::from_value(json!({
            "id": "p1",
            "slug": "minio",
            "name": "MinIO",
            "capabilities": {"serviceType": "minio"}
        }))
        .expect("valid plugin json");
        assert_eq!(parsed.capabilities().service_type.as_deref(), Some("minio"));
    }
}
