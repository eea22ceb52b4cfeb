//! Marketplace ports for resolving management plugins and their components.

use crate::infrastructure::domain::{InstanceService, ManagementPlugin, PluginId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type for marketplace operations.
pub type MarketplaceResult<T> = Result<T, MarketplaceError>;

/// Read access to published management plugins.
#[async_trait]
pub trait PluginCatalog: Send + Sync {
    /// Resolves plugin metadata by identifier.
    async fn find_plugin(&self, plugin_id: &PluginId)
    -> MarketplaceResult<Option<ManagementPlugin>>;
}

/// Descriptor of a plugin-provided management view.
///
/// Rendering is the host's concern; this only says what to mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountableComponent {
    /// Plugin that provides the component.
    pub plugin_id: PluginId,
    /// Entry point the host mounts, e.g. a module URL.
    pub entry_point: String,
    /// Properties passed to the component.
    #[serde(default)]
    pub props: Value,
}

/// Loads the management component a plugin provides for a service.
#[async_trait]
pub trait ComponentLoader: Send + Sync {
    /// Loads the component for `service` from `plugin`.
    async fn load(
        &self,
        plugin: &ManagementPlugin,
        service: &InstanceService,
    ) -> MarketplaceResult<MountableComponent>;
}

/// Errors returned by marketplace adapters.
#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    /// The plugin ships no loadable component.
    #[error("plugin {0} provides no management component")]
    ComponentUnavailable(PluginId),

    /// The marketplace could not be reached.
    #[error("marketplace unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl MarketplaceError {
    /// Wraps a marketplace transport failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
