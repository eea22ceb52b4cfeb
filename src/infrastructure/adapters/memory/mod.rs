//! In-memory adapters for persistence, SSH transport and the marketplace.

mod marketplace;
mod repository;
mod ssh;

pub use marketplace::{InMemoryPluginCatalog, SlugComponentLoader};
pub use repository::InMemoryInfrastructureStore;
pub use ssh::ScriptedSshClient;
