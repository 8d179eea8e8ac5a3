//! Conversion d'une feature en paramètres de la requête d'insertion

use geojson::Feature;
use geoschema::TableSchema;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio_postgres::types::ToSql;

/// Ligne rejetée avant envoi à PostgreSQL
#[derive(Debug, Error)]
pub enum RowError {
    /// Feature sans géométrie: la colonne `geom` n'accepte pas de valeur nulle ici
    #[error("Feature has no geometry")]
    MissingGeometry,

    /// Objet ou tableau JSON imbriqué
    #[error("Property '{column}' holds a nested {kind}, which cannot be stored")]
    UnsupportedValue { column: String, kind: &'static str },

    /// Propriété absente du schéma déduit de la première feature
    #[error("Property '{0}' has no matching column")]
    UnknownColumn(String),

    /// Sérialisation de la géométrie en GeoJSON impossible
    #[error("Failed to serialize geometry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// SRID source et cible, tels que liés dans la requête
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Srids {
    pub source: i32,
    pub target: i32,
}

impl Srids {
    pub fn new(source: u32, target: u32) -> anyhow::Result<Self> {
        let to_i32 = |srid: u32| {
            i32::try_from(srid).map_err(|_| anyhow::anyhow!("SRID {} is out of range", srid))
        };
        Ok(Self {
            source: to_i32(source)?,
            target: to_i32(target)?,
        })
    }
}

/// Valeurs d'une ligne, dans l'ordre des colonnes du schéma
#[derive(Debug, Clone, PartialEq)]
pub struct RowValues {
    /// `None` = NULL
    pub values: Vec<Option<String>>,
    /// Géométrie sérialisée en GeoJSON
    pub geometry: String,
}

impl RowValues {
    /// Paramètres positionnels pour `TableSchema::insert_sql`
    pub fn params<'a>(&'a self, srids: &'a Srids) -> Vec<&'a (dyn ToSql + Sync)> {
        let mut params: Vec<&(dyn ToSql + Sync)> = self
            .values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect();
        params.push(&self.geometry);
        params.push(&srids.source);
        params.push(&srids.target);
        params
    }
}

/// Représentation texte d'une valeur scalaire, castée côté SQL
pub fn value_to_text(column: &str, value: &JsonValue) -> Result<Option<String>, RowError> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(b) => Ok(Some(b.to_string())),
        JsonValue::Number(n) => Ok(Some(n.to_string())),
        JsonValue::String(s) => Ok(Some(s.clone())),
        JsonValue::Array(_) => Err(RowError::UnsupportedValue {
            column: column.to_string(),
            kind: "array",
        }),
        JsonValue::Object(_) => Err(RowError::UnsupportedValue {
            column: column.to_string(),
            kind: "object",
        }),
    }
}

/// Construit les valeurs d'une feature.
///
/// Une clé absente donne NULL. Une clé inconnue du schéma fait échouer la
/// ligne: les colonnes ne sont jamais réconciliées.
pub fn row_values(schema: &TableSchema, feature: &Feature) -> Result<RowValues, RowError> {
    let geometry = feature.geometry.as_ref().ok_or(RowError::MissingGeometry)?;

    let mut values = vec![None; schema.columns.len()];
    if let Some(properties) = &feature.properties {
        for (key, value) in properties {
            let idx = schema
                .column_index(key)
                .ok_or_else(|| RowError::UnknownColumn(key.clone()))?;
            values[idx] = value_to_text(key, value)?;
        }
    }

    Ok(RowValues {
        values,
        geometry: serde_json::to_string(geometry)?,
    })
}
