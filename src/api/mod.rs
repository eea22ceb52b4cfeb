//! REST facade over the infrastructure services.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/infrastructure/instances` | List instances (`spaceId`, `type`, `status`, `tag`) |
//! | POST | `/infrastructure/instances` | Register an instance |
//! | GET | `/infrastructure/instances/{id}` | Get an instance |
//! | DELETE | `/infrastructure/instances/{id}` | Delete an instance and its services |
//! | PUT | `/infrastructure/instances/{id}/connection` | Replace connection settings |
//! | POST | `/infrastructure/instances/{id}/test-connection` | Connect and disconnect |
//! | POST | `/infrastructure/instances/{id}/execute` | Run a shell command |
//! | POST | `/infrastructure/instances/{id}/health-check` | Probe health now |
//! | POST | `/infrastructure/instances/{id}/discover` | Run a discovery sweep |
//! | GET | `/infrastructure/instances/{id}/services` | List services |
//! | POST | `/infrastructure/instances/{id}/services` | Add a manual service |
//! | GET | `/infrastructure/instances/{id}/tags` | Derived tags |
//! | POST | `/infrastructure/services/remote` | Register a remote service |
//! | POST | `/infrastructure/services/{id}/assign-plugin` | Bind a plugin |
//! | DELETE | `/infrastructure/services/{id}/assign-plugin` | Unbind the plugin |
//! | GET | `/infrastructure/services/{id}/component` | Plugin management component |

pub mod dto;
mod error;
pub mod handlers;
mod state;

pub use error::ApiError;
pub use state::{
    ApiState, FleetBindings, FleetConnections, FleetDiscovery, FleetHealth, FleetRegistry,
    FleetTags, ServiceSettings,
};

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

/// Builds the REST router.
#[must_use]
pub fn build_router(state: ApiState) -> Router {
    let infrastructure = Router::new()
        .route(
            "/instances",
            get(handlers::list_instances).post(handlers::create_instance),
        )
        .route(
            "/instances/{id}",
            get(handlers::get_instance).delete(handlers::delete_instance),
        )
        .route("/instances/{id}/connection", put(handlers::update_connection))
        .route(
            "/instances/{id}/test-connection",
            post(handlers::test_connection),
        )
        .route("/instances/{id}/execute", post(handlers::execute_command))
        .route("/instances/{id}/health-check", post(handlers::health_check))
        .route("/instances/{id}/discover", post(handlers::discover_services))
        .route(
            "/instances/{id}/services",
            get(handlers::list_services).post(handlers::add_service),
        )
        .route("/instances/{id}/tags", get(handlers::instance_tags))
        .route(
            "/services/remote",
            post(handlers::register_remote_service),
        )
        .route(
            "/services/{id}/assign-plugin",
            post(handlers::assign_plugin).delete(handlers::unassign_plugin),
        )
        .route("/services/{id}/component", get(handlers::service_component))
        .with_state(state);

    Router::new()
        .nest("/infrastructure", infrastructure)
        .layer(TraceLayer::new_for_http())
}
