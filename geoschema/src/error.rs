//! Types d'erreurs pour le crate geoschema

use std::path::PathBuf;

use thiserror::Error;

/// Erreurs pouvant survenir lors de l'inspection d'un document GeoJSON
#[derive(Debug, Error)]
pub enum InspectError {
    /// Fichier illisible
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Aucun encodage de la liste n'a pu décoder le fichier
    #[error("Could not decode file with any of these encodings: {}", .encodings.join(", "))]
    Decoding { encodings: Vec<&'static str> },

    /// Document structurellement invalide
    #[error("Invalid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),

    /// GeoJSON valide mais qui n'est pas une FeatureCollection
    #[error("Expected a FeatureCollection, found a {0}")]
    NotACollection(&'static str),
}

/// Identifiant SQL refusé
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentError {
    #[error("Identifier is empty")]
    Empty,

    #[error("Identifier '{0}' is longer than 63 bytes")]
    TooLong(String),

    #[error("Identifier contains a NUL character")]
    Nul,
}

/// Erreurs de synthèse du schéma de table
#[derive(Debug, Error)]
pub enum SynthError {
    /// Nom de table ou de colonne invalide
    #[error("Invalid identifier: {0}")]
    Ident(#[from] IdentError),

    /// Écriture du fichier DDL impossible
    #[error("Failed to write DDL to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InspectError {
    /// Crée une erreur d'I/O avec le chemin concerné
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
