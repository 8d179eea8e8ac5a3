//! # geoschema
//!
//! Inspection de documents GeoJSON et synthèse de tables PostGIS.
//!
//! ## Features
//!
//! - Décodage avec repli sur plusieurs encodages (`encoding_rs`)
//! - Résolution d'un type de géométrie unique par famille (Point/Line/Polygon)
//! - Typage des colonnes depuis les propriétés de la première feature
//! - Détection du CRS source (bloc `crs` du document)
//! - DDL `CREATE TABLE` et requête d'insertion paramétrée, identifiants quotés
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geoschema::{inspect_path, TableSchema};
//! use std::path::Path;
//!
//! let inspection = inspect_path(Path::new("dams.geojson"))?;
//! println!("{}", inspection.summary());
//!
//! let schema = TableSchema::from_properties(
//!     "public",
//!     "utah_dams",
//!     &inspection.properties,
//!     inspection.geometry_type,
//!     4326,
//! )?;
//! schema.write_ddl(Path::new("."))?;
//! ```

pub mod crs;
pub mod encoding;
pub mod error;
pub mod geometry;
pub mod ident;
pub mod inspect;
pub mod synth;

pub use crs::{resolve_source_srid, SridOrigin, SridResolution, DEFAULT_SRID};
pub use encoding::SourceEncoding;
pub use error::{IdentError, InspectError, SynthError};
pub use geometry::{resolve_geometry_type, GeometryKind};
pub use inspect::{inspect_bytes, inspect_path, inspect_str, Extent, Inspection};
pub use synth::{column_type_for, Column, ColumnType, TableSchema};

/// Réexport pour les appelants qui manipulent les features
pub use geojson::{Feature, FeatureCollection, JsonObject};
