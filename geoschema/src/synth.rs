//! Synthèse du schéma de table PostGIS à partir des propriétés GeoJSON

use std::path::{Path, PathBuf};

use geojson::JsonObject;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::geometry::{postgis_type, GeometryKind};
use crate::ident::{self, qualified, quote};
use crate::{IdentError, SynthError};

/// Nom de la clé primaire auto-incrémentée
pub const ID_COLUMN: &str = "id";

/// Nom de la colonne géométrique
pub const GEOMETRY_COLUMN: &str = "geom";

/// Type SQL d'une colonne de propriété
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Boolean,
    Integer,
    BigInt,
    Numeric,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Numeric => "NUMERIC",
            Self::Text => "TEXT",
        }
    }
}

/// Type de colonne pour une valeur de propriété.
///
/// Les booléens JSON sont une variante distincte des nombres et ne peuvent
/// pas être pris pour des entiers. Les entiers hors de la plage 32 bits
/// passent en `BIGINT`. Chaînes, `null`, tableaux et objets donnent `TEXT`.
pub fn column_type_for(value: &JsonValue) -> ColumnType {
    match value {
        JsonValue::Bool(_) => ColumnType::Boolean,
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => ColumnType::Integer,
            Some(_) => ColumnType::BigInt,
            // flottants et entiers au-delà de i64
            None => ColumnType::Numeric,
        },
        _ => ColumnType::Text,
    }
}

/// Colonne dérivée d'une propriété
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Clé de propriété, telle quelle
    pub name: String,
    pub column_type: ColumnType,
}

/// Schéma complet d'une table cible
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub schema: String,
    pub table: String,
    pub columns: Vec<Column>,
    pub geometry_type: Option<GeometryKind>,
    pub target_srid: u32,
}

impl TableSchema {
    /// Construit le schéma depuis les propriétés de la première feature.
    ///
    /// L'ordre des colonnes suit l'ordre des clés dans le document.
    pub fn from_properties(
        schema: &str,
        table: &str,
        properties: &JsonObject,
        geometry_type: Option<GeometryKind>,
        target_srid: u32,
    ) -> Result<Self, IdentError> {
        ident::validate(schema)?;
        ident::validate(table)?;

        let columns = properties
            .iter()
            .map(|(name, value)| {
                ident::validate(name)?;
                Ok(Column {
                    name: name.clone(),
                    column_type: column_type_for(value),
                })
            })
            .collect::<Result<Vec<_>, IdentError>>()?;

        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
            geometry_type,
            target_srid,
        })
    }

    /// `"schema"."table"`
    pub fn qualified_name(&self) -> String {
        qualified(&self.schema, &self.table)
    }

    /// Position d'une colonne de propriété
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Type déclaré de la colonne `geom`
    pub fn geometry_sql_type(&self) -> String {
        format!(
            "GEOMETRY({}, {})",
            postgis_type(self.geometry_type),
            self.target_srid
        )
    }

    /// Instruction `CREATE TABLE` complète
    pub fn create_table_sql(&self) -> String {
        let mut lines = vec![format!("    {} SERIAL PRIMARY KEY", ID_COLUMN)];
        lines.extend(
            self.columns
                .iter()
                .map(|c| format!("    {} {}", quote(&c.name), c.column_type.sql())),
        );
        lines.push(format!("    {} {}", GEOMETRY_COLUMN, self.geometry_sql_type()));

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
            self.qualified_name(),
            lines.join(",\n")
        )
    }

    /// Requête d'insertion paramétrée.
    ///
    /// Les valeurs de propriétés sont liées en texte (`$1..$n`) puis castées
    /// vers le type de leur colonne. Viennent ensuite le GeoJSON de la
    /// géométrie, le SRID source et le SRID cible. La reprojection est faite
    /// par PostGIS; `ST_Multi` est appliqué quand la colonne est d'un type
    /// multiple.
    pub fn insert_sql(&self) -> String {
        let n = self.columns.len();

        let mut targets: Vec<String> = self.columns.iter().map(|c| quote(&c.name)).collect();
        targets.push(GEOMETRY_COLUMN.to_string());

        let mut values: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("${}::text::{}", i + 1, c.column_type.sql()))
            .collect();

        let transformed = format!(
            "ST_Transform(ST_SetSRID(ST_GeomFromGeoJSON(${}::text), ${}::integer), ${}::integer)",
            n + 1,
            n + 2,
            n + 3
        );
        values.push(match self.geometry_type {
            Some(kind) if kind.is_multi() => format!("ST_Multi({})", transformed),
            _ => transformed,
        });

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_name(),
            targets.join(", "),
            values.join(", ")
        )
    }

    /// Nombre de paramètres attendus par [`Self::insert_sql`]
    pub fn insert_param_count(&self) -> usize {
        self.columns.len() + 3
    }

    /// Nom du fichier DDL: `<table>_table_structure.sql`
    pub fn ddl_file_name(&self) -> String {
        format!("{}_table_structure.sql", self.table)
    }

    /// Écrit le DDL dans `dir` pour relecture avant exécution
    pub fn write_ddl(&self, dir: &Path) -> Result<PathBuf, SynthError> {
        let path = dir.join(self.ddl_file_name());
        std::fs::write(&path, self.create_table_sql()).map_err(|source| SynthError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), table = %self.table, "DDL written");
        Ok(path)
    }
}
