//! Adapter implementations for infrastructure ports.

pub mod connectors;
pub mod discovery;
pub mod memory;
pub mod postgres;
