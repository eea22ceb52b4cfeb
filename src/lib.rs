//! Fleetwright: infrastructure instance and service management.
//!
//! This crate registers heterogeneous compute targets, reaches them through
//! protocol-specific connectors, discovers the services they run, keeps
//! their health current and binds marketplace management plugins to
//! individual services.
//!
//! # Architecture
//!
//! Fleetwright follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (SSH, Docker, database)
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`infrastructure`]: Instances, services, connectors, discovery, health,
//!   tags and plugin bindings
//! - [`api`]: REST facade
//! - [`config`]: Layered daemon configuration
//! - [`telemetry`]: Tracing subscriber setup
//! - [`shell`]: Safe construction of remote command lines

pub mod api;
pub mod config;
pub mod infrastructure;
pub mod shell;
pub mod telemetry;
