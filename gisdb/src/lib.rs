//! # gisdb
//!
//! Chargement de fichiers GeoJSON dans PostGIS et requêtes d'analyse
//! spatiale.
//!
//! ## Features
//!
//! - Pool de connexions PostgreSQL (TLS optionnel)
//! - Création de table à partir du schéma déduit du GeoJSON
//! - Insertion ligne à ligne avec savepoints et rapport d'échecs
//! - Reprojection déléguée à PostGIS (`ST_Transform`)
//! - Introspection du catalogue et rapports centrales/barrages
//!
//! ## Usage CLI
//!
//! ```bash
//! # Inspection seule
//! gisdb inspect --path ./power_plants.geojson
//!
//! # Chargement
//! gisdb ingest --path ./utah-dams.geojson --table utah-dams --yes
//!
//! # Rapports
//! gisdb plants --csv-dir ./results
//! gisdb dams --dam ALL
//! ```

pub mod config;
pub mod confirm;
pub mod db;
pub mod ingest;
pub mod report;
pub mod reports;

pub use config::{AppConfig, CommitMode};
pub use db::{create_pool, DatabaseConfig};
pub use ingest::{ingest, IngestOutcome, IngestRequest};
pub use report::{LoadReport, LoadStatus};
