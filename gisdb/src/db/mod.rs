//! Accès PostgreSQL/PostGIS: pool de connexions et introspection du catalogue

pub mod catalog;
pub mod pool;

pub use pool::{create_pool, postgis_version, DatabaseConfig, SslMode};
