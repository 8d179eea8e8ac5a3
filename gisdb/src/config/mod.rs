//! Configuration de l'application (fichier JSON optionnel)
//!
//! Ordre de priorité: options CLI > fichier de configuration > variables
//! d'environnement > valeurs par défaut.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Configuration principale
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub ingest: IngestSection,
}

/// Surcharges de connexion; les champs absents conservent la valeur
/// issue de l'environnement.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub pool_size: Option<usize>,
    pub ssl_mode: Option<String>,
}

impl DatabaseSection {
    /// Fusionne deux sections, `other` l'emporte quand il est renseigné
    pub fn merged(&self, other: &DatabaseSection) -> DatabaseSection {
        DatabaseSection {
            host: other.host.clone().or_else(|| self.host.clone()),
            port: other.port.or(self.port),
            dbname: other.dbname.clone().or_else(|| self.dbname.clone()),
            user: other.user.clone().or_else(|| self.user.clone()),
            password: other.password.clone().or_else(|| self.password.clone()),
            pool_size: other.pool_size.or(self.pool_size),
            ssl_mode: other.ssl_mode.clone().or_else(|| self.ssl_mode.clone()),
        }
    }
}

/// Politique de commit en fin de chargement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Les lignes insérées sont validées même si d'autres ont échoué
    #[default]
    BestEffort,
    /// Une seule ligne en échec annule tout le chargement
    AllOrNothing,
}

/// Paramètres par défaut du chargement
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestSection {
    pub schema: String,
    pub target_srid: u32,
    pub commit_mode: CommitMode,
    pub progress_every: usize,
    pub ddl_dir: PathBuf,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            schema: "public".into(),
            target_srid: geoschema::DEFAULT_SRID,
            commit_mode: CommitMode::BestEffort,
            progress_every: 100,
            ddl_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge le fichier s'il est fourni, sinon les valeurs par défaut
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ingest.schema, "public");
        assert_eq!(config.ingest.target_srid, 4326);
        assert_eq!(config.ingest.commit_mode, CommitMode::BestEffort);
        assert_eq!(config.ingest.progress_every, 100);
        assert!(config.database.host.is_none());
    }

    #[test]
    fn test_partial_json() {
        let config: AppConfig = serde_json::from_str(
            r#"{"database": {"host": "gis.local", "port": 5433},
                "ingest": {"commit_mode": "all-or-nothing", "target_srid": 3857}}"#,
        )
        .unwrap();

        assert_eq!(config.database.host.as_deref(), Some("gis.local"));
        assert_eq!(config.database.port, Some(5433));
        assert_eq!(config.ingest.commit_mode, CommitMode::AllOrNothing);
        assert_eq!(config.ingest.target_srid, 3857);
        assert_eq!(config.ingest.schema, "public");
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gisdb.json");
        std::fs::write(&path, r#"{"ingest": {"schema": "staging"}}"#).unwrap();

        let config = AppConfig::load_optional(Some(&path)).unwrap();
        assert_eq!(config.ingest.schema, "staging");

        assert!(AppConfig::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_merged_sections() {
        let file = DatabaseSection {
            host: Some("file-host".into()),
            user: Some("file-user".into()),
            ..Default::default()
        };
        let cli = DatabaseSection {
            host: Some("cli-host".into()),
            ..Default::default()
        };

        let merged = file.merged(&cli);
        assert_eq!(merged.host.as_deref(), Some("cli-host"));
        assert_eq!(merged.user.as_deref(), Some("file-user"));
        assert!(merged.port.is_none());
    }
}
