//! Requêtes d'exemple sur une table de centrales électriques
//!
//! Les colonnes nom/type/capacité sont découvertes dans le catalogue; une
//! requête qui dépend d'une colonne absente est sautée.

use std::path::PathBuf;

use anyhow::{Context, Result};
use geoschema::ident::{qualified, quote};
use serde_json::Value as JsonValue;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;
use tracing::{info, warn};

use super::{cell_text, run_and_show, ReportOptions, ResultTable};
use crate::db::catalog::{find_column_among, find_column_containing, quoted_list, table_exists};

/// Centre par défaut de la recherche par rayon (Chicago)
pub const DEFAULT_CENTER: (f64, f64) = (-87.6298, 41.8781);

pub const DEFAULT_RADIUS_KM: f64 = 100.0;

/// Paramètres des requêtes
#[derive(Debug, Clone)]
pub struct PlantsQuery {
    pub schema: String,
    pub table: String,
    /// (longitude, latitude) en WGS84
    pub center: (f64, f64),
    pub center_label: String,
    pub radius_km: f64,
    /// Fichier de sortie de l'export GeoJSON
    pub geojson_out: Option<PathBuf>,
}

impl PlantsQuery {
    pub fn new(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            center: DEFAULT_CENTER,
            center_label: "Chicago".into(),
            radius_km: DEFAULT_RADIUS_KM,
            geojson_out: None,
        }
    }

    fn qualified(&self) -> String {
        qualified(&self.schema, &self.table)
    }
}

/// Colonnes utiles découvertes dans la table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantColumns {
    pub all: Vec<String>,
    pub name: Option<String>,
    pub plant_type: Option<String>,
    pub capacity: Option<String>,
}

impl PlantColumns {
    pub fn discover(all: Vec<String>) -> Self {
        let capacity = find_column_containing(&all, &["capacity", "mw"]).map(str::to_string);
        let name =
            find_column_among(&all, &["name", "plant_name", "station_name"]).map(str::to_string);
        let plant_type =
            find_column_among(&all, &["type", "plant_type", "station_type"]).map(str::to_string);
        Self {
            all,
            name,
            plant_type,
            capacity,
        }
    }

    /// Colonnes attributaires, sans la géométrie
    pub fn attributes(&self) -> impl Iterator<Item = &str> + '_ {
        self.all
            .iter()
            .map(String::as_str)
            .filter(|c| *c != geoschema::synth::GEOMETRY_COLUMN)
    }

    /// Colonnes exportées dans les propriétés GeoJSON
    pub fn exported(&self) -> Vec<&str> {
        [&self.name, &self.plant_type, &self.capacity]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

pub fn columns_sql() -> &'static str {
    "SELECT column_name::text AS column_name, data_type::text AS data_type
     FROM information_schema.columns
     WHERE table_schema::text = $1::text AND table_name::text = $2::text
     ORDER BY ordinal_position"
}

pub fn sample_sql(table: &str) -> String {
    format!("SELECT * FROM {} LIMIT 10", table)
}

pub fn by_type_sql(table: &str, type_col: &str) -> String {
    format!(
        "SELECT {t}, COUNT(*) AS count FROM {table} GROUP BY {t} ORDER BY count DESC",
        t = quote(type_col),
    )
}

pub fn capacity_sql(table: &str, name_col: &str, type_col: &str, cap_col: &str) -> String {
    format!(
        "SELECT {n}, {t}, {c} AS capacity FROM {table}
         WHERE {c} IS NOT NULL
         ORDER BY {c} DESC
         LIMIT 20",
        n = quote(name_col),
        t = quote(type_col),
        c = quote(cap_col),
    )
}

/// Paramètres: `$1` longitude, `$2` latitude, `$3` rayon en mètres
pub fn within_radius_sql(table: &str, attributes: &str) -> String {
    let center = "ST_SetSRID(ST_MakePoint($1::float8, $2::float8), 4326)::geography";
    let select = if attributes.is_empty() {
        String::new()
    } else {
        format!("{}, ", attributes)
    };
    format!(
        "SELECT {select}ST_Distance(geom::geography, {center}) / 1000 AS distance_km
         FROM {table}
         WHERE ST_DWithin(geom::geography, {center}, $3::float8)
         ORDER BY distance_km
         LIMIT 100"
    )
}

pub fn by_state_sql(table: &str) -> String {
    format!(
        "SELECT states.name AS state_name, COUNT(*) AS plant_count
         FROM {table} plants
         JOIN states ON ST_Contains(states.geom, plants.geom)
         GROUP BY states.name
         ORDER BY plant_count DESC"
    )
}

/// Les centroïdes servent pour les géométries non ponctuelles
pub fn quadrants_sql(table: &str) -> String {
    format!(
        "WITH bounds AS (
             SELECT ST_XMin(ST_Extent(geom)) AS min_lon,
                    ST_XMax(ST_Extent(geom)) AS max_lon,
                    ST_YMin(ST_Extent(geom)) AS min_lat,
                    ST_YMax(ST_Extent(geom)) AS max_lat
             FROM {table}
         ),
         quadrants AS (
             SELECT CASE WHEN ST_X(ST_Centroid(geom)) < (SELECT (min_lon + max_lon) / 2 FROM bounds)
                         THEN 'West' ELSE 'East' END AS longitude_half,
                    CASE WHEN ST_Y(ST_Centroid(geom)) < (SELECT (min_lat + max_lat) / 2 FROM bounds)
                         THEN 'South' ELSE 'North' END AS latitude_half
             FROM {table}
             WHERE geom IS NOT NULL
         )
         SELECT longitude_half || ' ' || latitude_half AS quadrant, COUNT(*) AS plant_count
         FROM quadrants
         GROUP BY quadrant
         ORDER BY plant_count DESC"
    )
}

pub fn nuclear_count_sql(table: &str, type_col: &str) -> String {
    format!(
        "SELECT COUNT(*) AS nuclear_count FROM {table} WHERE {t}::text ILIKE '%nuclear%'",
        t = quote(type_col)
    )
}

pub fn nearest_sql(table: &str, name_col: &str, type_col: &str) -> String {
    format!(
        "WITH nuclear_plants AS (
             SELECT id, {n}, geom
             FROM {table}
             WHERE {t}::text ILIKE '%nuclear%'
             LIMIT 20
         )
         SELECT np.{n} AS nuclear_plant,
                p.{n} AS nearest_plant,
                p.{t} AS plant_type,
                ST_Distance(np.geom::geography, p.geom::geography) / 1000 AS distance_km
         FROM nuclear_plants np
         CROSS JOIN LATERAL (
             SELECT {n}, {t}, geom
             FROM {table}
             WHERE {t}::text NOT ILIKE '%nuclear%'
             ORDER BY np.geom <-> geom
             LIMIT 1
         ) p
         ORDER BY distance_km
         LIMIT 20",
        n = quote(name_col),
        t = quote(type_col),
    )
}

/// Les clés des propriétés sont liées en paramètres (`$1`, `$2`...)
pub fn geojson_sql(table: &str, columns: &[&str]) -> String {
    let properties: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("${}::text, {}", i + 1, quote(c)))
        .collect();
    let selected = if columns.is_empty() {
        String::new()
    } else {
        format!("{}, ", quoted_list(columns.iter().copied()))
    };
    let props = if properties.is_empty() {
        String::new()
    } else {
        format!(", {}", properties.join(", "))
    };

    format!(
        "SELECT json_build_object(
             'type', 'FeatureCollection',
             'features', COALESCE(json_agg(
                 json_build_object(
                     'type', 'Feature',
                     'geometry', ST_AsGeoJSON(geom)::json,
                     'properties', json_build_object('id', id{props})
                 )
             ), '[]'::json)
         ) AS geojson
         FROM (
             SELECT id, {selected}geom
             FROM {table}
             LIMIT 100
         ) sub"
    )
}

/// Nombre de centrales nucléaires; 0 si le comptage a échoué
pub fn nuclear_count(counted: Option<&ResultTable>) -> i64 {
    counted
        .and_then(|t| t.first_value("nuclear_count"))
        .and_then(JsonValue::as_i64)
        .unwrap_or(0)
}

/// Exécute une requête; une erreur est journalisée et la série continue
async fn attempt(
    client: &Client,
    description: &str,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
    options: &ReportOptions,
) -> Option<ResultTable> {
    match run_and_show(client, description, sql, params, options).await {
        Ok(table) => Some(table),
        Err(e) => {
            println!("Error executing query: {:#}", e);
            warn!(description, error = %e, "Query failed");
            None
        }
    }
}

fn skipped(description: &str, reason: &str) {
    println!("\n=== {} ===", description);
    println!("Skipped - {}", reason);
}

/// Enchaîne toutes les requêtes d'exemple
pub async fn run_plant_reports(
    client: &Client,
    query: &PlantsQuery,
    options: &ReportOptions,
) -> Result<Vec<ResultTable>> {
    let table = query.qualified();
    let mut results = Vec::new();

    let columns_table = run_and_show(
        client,
        "Table Columns",
        columns_sql(),
        &[&query.schema, &query.table],
        options,
    )
    .await?;
    if columns_table.is_empty() {
        anyhow::bail!(
            "Could not retrieve columns for table '{}.{}'",
            query.schema,
            query.table
        );
    }

    let names: Vec<String> = columns_table
        .column_values("column_name")
        .into_iter()
        .map(cell_text)
        .collect();
    let cols = PlantColumns::discover(names);
    for (label, found) in [
        ("capacity", &cols.capacity),
        ("name", &cols.name),
        ("type", &cols.plant_type),
    ] {
        if let Some(col) = found {
            println!("Found {} column: {}", label, col);
        }
    }
    results.push(columns_table);

    results.extend(attempt(client, "Basic Sample of Data", &sample_sql(&table), &[], options).await);

    if let Some(type_col) = &cols.plant_type {
        results.extend(
            attempt(client, "Power Plants by Type", &by_type_sql(&table, type_col), &[], options)
                .await,
        );
    } else {
        skipped("Power Plants by Type", "no type column found.");
    }

    if let (Some(name), Some(kind), Some(cap)) = (&cols.name, &cols.plant_type, &cols.capacity) {
        results.extend(
            attempt(
                client,
                "Largest Capacity Power Plants",
                &capacity_sql(&table, name, kind, cap),
                &[],
                options,
            )
            .await,
        );
    } else {
        skipped(
            "Largest Capacity Power Plants",
            "name, type and capacity columns are all required.",
        );
    }

    let (lon, lat) = query.center;
    let radius_m = query.radius_km * 1000.0;
    let description = format!(
        "Power Plants within {}km of {}",
        query.radius_km, query.center_label
    );
    results.extend(
        attempt(
            client,
            &description,
            &within_radius_sql(&table, &quoted_list(cols.attributes())),
            &[&lon, &lat, &radius_m],
            options,
        )
        .await,
    );

    if table_exists(client, "states").await? {
        results.extend(
            attempt(client, "Power Plants Count by State", &by_state_sql(&table), &[], options)
                .await,
        );
    } else {
        skipped("Power Plants Count by State", "'states' table doesn't exist.");
        println!("To run this query, you would need to import state boundaries.");
    }

    results.extend(
        attempt(
            client,
            "Power Plants by Geographic Quadrant",
            &quadrants_sql(&table),
            &[],
            options,
        )
        .await,
    );

    if let (Some(name), Some(kind)) = (&cols.name, &cols.plant_type) {
        let counted = attempt(
            client,
            "Nuclear Plant Count",
            &nuclear_count_sql(&table, kind),
            &[],
            options,
        )
        .await;
        let nuclear = nuclear_count(counted.as_ref());
        info!(nuclear, "Nuclear plants found");
        results.extend(counted);

        if nuclear > 0 {
            results.extend(
                attempt(
                    client,
                    "Nearest Non-Nuclear Plant to Each Nuclear Plant",
                    &nearest_sql(&table, name, kind),
                    &[],
                    options,
                )
                .await,
            );
        }
    }

    if cols.name.is_some() {
        let exported = cols.exported();
        let keys: Vec<String> = exported.iter().map(|c| c.to_string()).collect();
        let params: Vec<&(dyn ToSql + Sync)> =
            keys.iter().map(|k| k as &(dyn ToSql + Sync)).collect();

        let export_options = ReportOptions {
            display_limit: 1,
            ..options.clone()
        };
        if let Some(export) = attempt(
            client,
            "GeoJSON Export Sample",
            &geojson_sql(&table, &exported),
            &params,
            &export_options,
        )
        .await
        {
            if let Some(path) = &query.geojson_out {
                write_geojson(&export, path)?;
            }
            results.push(export);
        }
    }

    println!("\n\nAll queries completed.");
    Ok(results)
}

/// Écrit la FeatureCollection de l'export dans un fichier
pub fn write_geojson(export: &ResultTable, path: &std::path::Path) -> Result<()> {
    let value = export
        .first_value("geojson")
        .cloned()
        .unwrap_or(JsonValue::Null);
    let json = serde_json::to_string_pretty(&value)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write GeoJSON to {}", path.display()))?;

    println!("GeoJSON saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_discover_columns() {
        let found = PlantColumns::discover(cols(&[
            "id",
            "NAME",
            "TYPE",
            "PRIM_FUEL",
            "SUMMER_CAP",
            "Total_MW",
            "geom",
        ]));
        assert_eq!(found.name.as_deref(), Some("NAME"));
        assert_eq!(found.plant_type.as_deref(), Some("TYPE"));
        assert_eq!(found.capacity.as_deref(), Some("Total_MW"));
        assert_eq!(found.exported(), vec!["NAME", "TYPE", "Total_MW"]);
        assert!(!found.attributes().any(|c| c == "geom"));
    }

    #[test]
    fn test_discover_nothing() {
        let found = PlantColumns::discover(cols(&["id", "label", "geom"]));
        assert_eq!(found.name, None);
        assert_eq!(found.plant_type, None);
        assert_eq!(found.capacity, None);
        assert!(found.exported().is_empty());
    }

    #[test]
    fn test_sql_quotes_identifiers() {
        let table = qualified("public", "power_plants");
        assert_eq!(
            by_type_sql(&table, "Type"),
            "SELECT \"Type\", COUNT(*) AS count FROM \"public\".\"power_plants\" GROUP BY \"Type\" ORDER BY count DESC"
        );
        let sql = capacity_sql(&table, "NAME", "TYPE", "SUMMER_CAP");
        assert!(sql.contains("WHERE \"SUMMER_CAP\" IS NOT NULL"));
        assert!(sql.contains("LIMIT 20"));
    }

    #[test]
    fn test_within_radius_sql() {
        let sql = within_radius_sql("\"public\".\"pp\"", "\"NAME\", \"TYPE\"");
        assert!(sql.starts_with("SELECT \"NAME\", \"TYPE\", ST_Distance("));
        assert!(sql.contains("ST_DWithin(geom::geography"));
        assert!(sql.contains("$3::float8"));

        let bare = within_radius_sql("\"public\".\"pp\"", "");
        assert!(bare.starts_with("SELECT ST_Distance("));
    }

    #[test]
    fn test_geojson_sql_binds_keys() {
        let sql = geojson_sql("\"public\".\"pp\"", &["NAME", "TYPE"]);
        assert!(sql.contains("json_build_object('id', id, $1::text, \"NAME\", $2::text, \"TYPE\")"));
        assert!(sql.contains("SELECT id, \"NAME\", \"TYPE\", geom"));
        assert!(sql.contains("LIMIT 100"));
    }

    #[test]
    fn test_nuclear_count() {
        let counted = ResultTable {
            description: "Nuclear Plant Count".into(),
            columns: vec!["nuclear_count".into()],
            rows: vec![vec![json!(3)]],
        };
        assert_eq!(nuclear_count(Some(&counted)), 3);
        // Comptage en échec: la série continue sans la requête du plus proche
        assert_eq!(nuclear_count(None), 0);
        assert!(nuclear_count_sql("\"public\".\"pp\"", "TYPE").contains("AS nuclear_count"));
    }

    #[test]
    fn test_write_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plants.geojson");
        let export = ResultTable {
            description: "GeoJSON Export Sample".into(),
            columns: vec!["geojson".into()],
            rows: vec![vec![json!({"type": "FeatureCollection", "features": []})]],
        };
        write_geojson(&export, &path).unwrap();

        let written: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["type"], "FeatureCollection");
    }
}
