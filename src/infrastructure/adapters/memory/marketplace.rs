//! Static marketplace adapters backed by configuration.

use crate::infrastructure::{
    domain::{InstanceService, ManagementPlugin, PluginId},
    ports::{
        ComponentLoader, MarketplaceError, MarketplaceResult, MountableComponent, PluginCatalog,
    },
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Plugin catalog holding a fixed set of plugins.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPluginCatalog {
    plugins: Arc<RwLock<HashMap<PluginId, ManagementPlugin>>>,
}

impl InMemoryPluginCatalog {
    /// Creates a catalog from a list of plugins.
    #[must_use]
    pub fn new(plugins: impl IntoIterator<Item = ManagementPlugin>) -> Self {
        let indexed = plugins
            .into_iter()
            .map(|plugin| (plugin.id().clone(), plugin))
            .collect();
        Self {
            plugins: Arc::new(RwLock::new(indexed)),
        }
    }

    /// Publishes or replaces a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Unavailable`] when lock acquisition fails.
    pub fn publish(&self, plugin: ManagementPlugin) -> MarketplaceResult<()> {
        let mut plugins = self.plugins.write().map_err(|err| {
            MarketplaceError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        plugins.insert(plugin.id().clone(), plugin);
        Ok(())
    }
}

#[async_trait]
impl PluginCatalog for InMemoryPluginCatalog {
    async fn find_plugin(
        &self,
        plugin_id: &PluginId,
    ) -> MarketplaceResult<Option<ManagementPlugin>> {
        let plugins = self.plugins.read().map_err(|err| {
            MarketplaceError::unavailable(std::io::Error::other(err.to_string()))
        })?;
        Ok(plugins.get(plugin_id).cloned())
    }
}

/// Component loader that derives entry points from the plugin slug.
///
/// The entry point is `{base_url}/{slug}/component.js`.
#[derive(Debug, Clone)]
pub struct SlugComponentLoader {
    base_url: String,
}

impl SlugComponentLoader {
    /// Creates a loader rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl ComponentLoader for SlugComponentLoader {
    async fn load(
        &self,
        plugin: &ManagementPlugin,
        service: &InstanceService,
    ) -> MarketplaceResult<MountableComponent> {
        let slug = plugin.slug().trim();
        if slug.is_empty() {
            return Err(MarketplaceError::ComponentUnavailable(plugin.id().clone()));
        }
        Ok(MountableComponent {
            plugin_id: plugin.id().clone(),
            entry_point: format!("{}/{slug}/component.js", self.base_url),
            props: json!({
                "serviceId": service.id(),
                "serviceName": service.name(),
                "endpoints": service.endpoints(),
                "config": service.management_config(),
            }),
        })
    }
}
