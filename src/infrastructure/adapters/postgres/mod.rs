//! `PostgreSQL` adapters for infrastructure persistence.

mod models;
mod repository;
mod schema;

pub use repository::{InfrastructurePgPool, PostgresInfrastructureStore};
