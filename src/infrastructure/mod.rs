//! Infrastructure instance and service management.
//!
//! Registers remote compute targets, reaches them through protocol-specific
//! connectors, discovers and normalizes the services they run, probes their
//! health, binds marketplace management plugins to services and derives
//! capability tags from those bindings. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
