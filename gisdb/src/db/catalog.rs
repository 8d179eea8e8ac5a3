//! Introspection du catalogue: tables, colonnes, colonnes géométriques
//!
//! Les colonnes de `information_schema` sont des domaines (`sql_identifier`,
//! `cardinal_number`); elles sont castées explicitement en `text`/`int`
//! pour être lues en types Rust.

use anyhow::{Context, Result};
use geoschema::ident::{qualified, quote};
use serde::Serialize;
use tokio_postgres::Client;
use tracing::debug;

/// Table utilisateur
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

/// Description d'une colonne
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<i32>,
    pub nullable: bool,
}

impl ColumnInfo {
    /// Type avec longueur maximale: `character varying(50)`
    pub fn type_label(&self) -> String {
        match self.max_length {
            Some(len) => format!("{}({})", self.data_type, len),
            None => self.data_type.clone(),
        }
    }
}

/// Entrée de la vue `geometry_columns`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeometryColumnInfo {
    pub column: String,
    pub geometry_type: String,
    pub srid: i32,
    pub dimensions: i32,
}

/// Tables de base hors schémas système
pub async fn list_tables(client: &Client) -> Result<Vec<TableRef>> {
    let rows = client
        .query(
            "SELECT table_schema::text, table_name::text
             FROM information_schema.tables
             WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
               AND table_type = 'BASE TABLE'
             ORDER BY table_schema, table_name",
            &[],
        )
        .await
        .context("Failed to list tables")?;

    Ok(rows
        .iter()
        .map(|row| TableRef {
            schema: row.get(0),
            name: row.get(1),
        })
        .collect())
}

/// Colonnes d'une table, dans l'ordre de déclaration
pub async fn describe_columns(client: &Client, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
    let rows = client
        .query(
            "SELECT column_name::text, data_type::text,
                    character_maximum_length::int, is_nullable::text
             FROM information_schema.columns
             WHERE table_schema::text = $1::text AND table_name::text = $2::text
             ORDER BY ordinal_position",
            &[&schema, &table],
        )
        .await
        .with_context(|| format!("Failed to describe columns of {}.{}", schema, table))?;

    Ok(rows
        .iter()
        .map(|row| {
            let nullable: String = row.get(3);
            ColumnInfo {
                name: row.get(0),
                data_type: row.get(1),
                max_length: row.get(2),
                nullable: nullable == "YES",
            }
        })
        .collect())
}

/// Colonnes géométriques enregistrées par PostGIS pour une table
pub async fn geometry_columns(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<Vec<GeometryColumnInfo>> {
    let rows = client
        .query(
            "SELECT f_geometry_column::text, type::text, srid::int, coord_dimension::int
             FROM geometry_columns
             WHERE f_table_schema::text = $1::text AND f_table_name::text = $2::text",
            &[&schema, &table],
        )
        .await
        .with_context(|| format!("Failed to read geometry columns of {}.{}", schema, table))?;

    Ok(rows
        .iter()
        .map(|row| GeometryColumnInfo {
            column: row.get(0),
            geometry_type: row.get(1),
            srid: row.get(2),
            dimensions: row.get(3),
        })
        .collect())
}

/// Nombre de lignes d'une table
pub async fn row_count(client: &Client, schema: &str, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", qualified(schema, table));
    let row = client
        .query_one(sql.as_str(), &[])
        .await
        .with_context(|| format!("Failed to count rows of {}.{}", schema, table))?;
    Ok(row.get(0))
}

/// Noms de colonnes, avec leur casse réelle
pub async fn actual_column_names(client: &Client, schema: &str, table: &str) -> Result<Vec<String>> {
    let rows = client
        .query(
            "SELECT column_name::text
             FROM information_schema.columns
             WHERE table_schema::text = $1::text AND table_name::text = $2::text
             ORDER BY ordinal_position",
            &[&schema, &table],
        )
        .await
        .with_context(|| format!("Failed to read column names of {}.{}", schema, table))?;

    let names: Vec<String> = rows.iter().map(|row| row.get(0)).collect();
    debug!(schema, table, columns = ?names, "Column names discovered");
    Ok(names)
}

/// Une table de ce nom existe-t-elle, tous schémas confondus
pub async fn table_exists(client: &Client, table: &str) -> Result<bool> {
    let row = client
        .query_one(
            "SELECT EXISTS (
                 SELECT 1 FROM information_schema.tables
                 WHERE table_name::text = $1::text
             )",
            &[&table],
        )
        .await
        .with_context(|| format!("Failed to check existence of table {}", table))?;
    Ok(row.get(0))
}

/// Colonne dont le nom correspond à `wanted` sans tenir compte de la casse
pub fn find_column<'a>(columns: &'a [String], wanted: &str) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(wanted))
        .map(String::as_str)
}

/// Comme [`find_column`], en erreur si la colonne manque
pub fn require_column<'a>(columns: &'a [String], wanted: &str, table: &str) -> Result<&'a str> {
    find_column(columns, wanted)
        .with_context(|| format!("Column {} not found in table {}", wanted, table))
}

/// Première colonne dont le nom (en minuscules) figure parmi `candidates`
pub fn find_column_among<'a>(columns: &'a [String], candidates: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| {
            let lower = c.to_lowercase();
            candidates.iter().any(|cand| *cand == lower)
        })
        .map(String::as_str)
}

/// Première colonne dont le nom (en minuscules) contient l'un des `needles`
pub fn find_column_containing<'a>(columns: &'a [String], needles: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| {
            let lower = c.to_lowercase();
            needles.iter().any(|n| lower.contains(n))
        })
        .map(String::as_str)
}

/// Liste de colonnes quotées, séparées par des virgules
pub fn quoted_list<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    columns.into_iter().map(quote).collect::<Vec<_>>().join(", ")
}
