//! Centrales situées dans la zone d'inondation d'un barrage

use anyhow::Result;
use geoschema::ident::{qualified, quote};
use tokio_postgres::Client;

use super::{cell_text, run_and_show, ReportOptions, ResultTable};
use crate::db::catalog::{actual_column_names, require_column};

/// Colonne du nom de barrage dans la liste des barrages
pub const DAM_NAME_COLUMN: &str = "Dam Name";

/// Barrages à analyser
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DamSelection {
    /// Le plus grand barrage (surface inondée)
    #[default]
    Largest,
    /// Tous les barrages listés
    All,
    /// Un barrage par son nom
    Named(String),
}

impl DamSelection {
    /// Vide = le plus grand, `ALL` (sans casse) = tous, sinon un nom
    pub fn parse(input: Option<&str>) -> Self {
        match input.map(str::trim) {
            None | Some("") => Self::Largest,
            Some(s) if s.eq_ignore_ascii_case("all") => Self::All,
            Some(s) => Self::Named(s.to_string()),
        }
    }

    /// Noms retenus parmi la liste des barrages
    pub fn resolve(&self, dams: &ResultTable) -> Vec<String> {
        let names = || dams.column_values(DAM_NAME_COLUMN).into_iter().map(cell_text);
        match self {
            Self::Largest => names().take(1).collect(),
            Self::All => names().collect(),
            Self::Named(name) => vec![name.clone()],
        }
    }
}

/// Paramètres du rapport
#[derive(Debug, Clone)]
pub struct DamsQuery {
    pub schema: String,
    pub dams_table: String,
    pub plants_table: String,
    pub limit: i64,
    pub selection: DamSelection,
}

impl DamsQuery {
    pub fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            dams_table: "utah_dams".into(),
            plants_table: "power_plants".into(),
            limit: 50,
            selection: DamSelection::Largest,
        }
    }
}

/// Paramètre: `$1` nombre de barrages
pub fn list_dams_sql(table: &str, name_col: &str, type_col: &str) -> String {
    format!(
        "SELECT {n} AS \"Dam Name\", {t} AS \"Type\",
                ROUND((ST_Area(geom::geography) / 1e6)::numeric, 2) AS \"Inundation Area (sq km)\"
         FROM {table}
         ORDER BY ST_Area(geom::geography) DESC NULLS LAST
         LIMIT $1::bigint",
        n = quote(name_col),
        t = quote(type_col),
    )
}

/// Noms des colonnes utilisées dans la jointure barrages/centrales
#[derive(Debug, Clone, Copy)]
pub struct RiskColumns<'a> {
    pub dam_name: &'a str,
    pub plant_name: &'a str,
    pub plant_type: &'a str,
    pub fuel: &'a str,
    pub capacity: &'a str,
}

/// Paramètre: `$1` nom du barrage
pub fn plants_at_risk_sql(dams: &str, plants: &str, cols: RiskColumns<'_>) -> String {
    format!(
        "SELECT p.{pn} AS \"Plant Name\", p.{pt} AS \"Type\",
                p.{fuel} AS \"Primary Fuel\", p.{cap} AS \"Capacity (MW)\"
         FROM {dams} d
         JOIN {plants} p ON ST_Intersects(d.geom, p.geom)
         WHERE d.{dn}::text = $1::text
         ORDER BY p.{cap} DESC NULLS LAST",
        pn = quote(cols.plant_name),
        pt = quote(cols.plant_type),
        fuel = quote(cols.fuel),
        cap = quote(cols.capacity),
        dn = quote(cols.dam_name),
    )
}

/// Barrages triés par surface inondée décroissante
pub async fn list_dams(client: &Client, query: &DamsQuery, options: &ReportOptions) -> Result<ResultTable> {
    let columns = actual_column_names(client, &query.schema, &query.dams_table).await?;
    let name_col = require_column(&columns, "NAME", &query.dams_table)?;
    let type_col = require_column(&columns, "TYPE", &query.dams_table)?;

    let description = format!("Top {} dams by inundation area", query.limit);
    let sql = list_dams_sql(&qualified(&query.schema, &query.dams_table), name_col, type_col);
    let listing = ReportOptions {
        display_limit: usize::try_from(query.limit).unwrap_or(usize::MAX),
        ..options.clone()
    };
    run_and_show(client, &description, &sql, &[&query.limit], &listing).await
}

/// Une description par barrage: elle donne aussi le nom du CSV
pub fn plants_at_risk_description(dam_name: &str) -> String {
    format!("Power Plants at Risk - {}", dam_name)
}

/// Centrales dont la géométrie intersecte la zone d'un barrage
pub async fn plants_at_risk(
    client: &Client,
    query: &DamsQuery,
    dam_name: &str,
    options: &ReportOptions,
) -> Result<ResultTable> {
    let dam_cols = actual_column_names(client, &query.schema, &query.dams_table).await?;
    let plant_cols = actual_column_names(client, &query.schema, &query.plants_table).await?;

    let cols = RiskColumns {
        dam_name: require_column(&dam_cols, "NAME", &query.dams_table)?,
        plant_name: require_column(&plant_cols, "NAME", &query.plants_table)?,
        plant_type: require_column(&plant_cols, "TYPE", &query.plants_table)?,
        fuel: require_column(&plant_cols, "PRIM_FUEL", &query.plants_table)?,
        capacity: require_column(&plant_cols, "SUMMER_CAP", &query.plants_table)?,
    };
    let sql = plants_at_risk_sql(
        &qualified(&query.schema, &query.dams_table),
        &qualified(&query.schema, &query.plants_table),
        cols,
    );

    let table = run_and_show(
        client,
        &plants_at_risk_description(dam_name),
        &sql,
        &[&dam_name],
        options,
    )
    .await?;
    if table.is_empty() {
        println!(
            "No power plants found within the inundation zone of '{}'.",
            dam_name
        );
    }
    Ok(table)
}

/// Liste les barrages puis analyse ceux de la sélection
pub async fn run_dam_reports(
    client: &Client,
    query: &DamsQuery,
    options: &ReportOptions,
) -> Result<Vec<(String, ResultTable)>> {
    let dams = list_dams(client, query, options).await?;
    let selected = query.selection.resolve(&dams);
    if selected.is_empty() {
        println!("No dams found in {}.", query.dams_table);
    }

    let mut reports = Vec::with_capacity(selected.len());
    for dam in selected {
        println!("\n{}", "=".repeat(60));
        println!("POWER-PLANT RISK REPORT FOR {}", dam);
        println!("{}", "=".repeat(60));

        let plants = plants_at_risk(client, query, &dam, options).await?;
        println!("\nTotal plants at risk: {}\n", plants.rows.len());
        reports.push((dam, plants));
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dams() -> ResultTable {
        ResultTable {
            description: "dams".into(),
            columns: vec![DAM_NAME_COLUMN.into(), "Type".into()],
            rows: vec![
                vec![json!("Flaming Gorge"), json!("Concrete")],
                vec![json!("Strawberry"), json!("Earth")],
            ],
        }
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(DamSelection::parse(None), DamSelection::Largest);
        assert_eq!(DamSelection::parse(Some("  ")), DamSelection::Largest);
        assert_eq!(DamSelection::parse(Some("all")), DamSelection::All);
        assert_eq!(
            DamSelection::parse(Some(" Strawberry ")),
            DamSelection::Named("Strawberry".into())
        );
    }

    #[test]
    fn test_resolve_selection() {
        assert_eq!(DamSelection::Largest.resolve(&dams()), vec!["Flaming Gorge"]);
        assert_eq!(
            DamSelection::All.resolve(&dams()),
            vec!["Flaming Gorge", "Strawberry"]
        );
        assert_eq!(
            DamSelection::Named("Jordanelle".into()).resolve(&dams()),
            vec!["Jordanelle"]
        );

        let empty = ResultTable {
            rows: Vec::new(),
            ..dams()
        };
        assert!(DamSelection::Largest.resolve(&empty).is_empty());
    }

    #[test]
    fn test_description_per_dam() {
        let a = ResultTable {
            description: plants_at_risk_description("Flaming Gorge"),
            ..dams()
        };
        let b = ResultTable {
            description: plants_at_risk_description("Strawberry"),
            ..dams()
        };
        let ts = chrono::Local::now();
        assert_eq!(
            a.csv_file_name(&ts),
            format!("results_Power_Plants_at_Risk___Flaming_Gorge_{}.csv", ts.format("%Y%m%d_%H%M%S"))
        );
        assert_ne!(a.csv_file_name(&ts), b.csv_file_name(&ts));
    }

    #[test]
    fn test_list_dams_sql() {
        let sql = list_dams_sql("\"public\".\"utah_dams\"", "Name", "Type");
        assert!(sql.starts_with("SELECT \"Name\" AS \"Dam Name\", \"Type\" AS \"Type\""));
        assert!(sql.contains("LIMIT $1::bigint"));
    }

    #[test]
    fn test_plants_at_risk_sql() {
        let sql = plants_at_risk_sql(
            "\"public\".\"utah_dams\"",
            "\"public\".\"power_plants\"",
            RiskColumns {
                dam_name: "NAME",
                plant_name: "NAME",
                plant_type: "TYPE",
                fuel: "PRIM_FUEL",
                capacity: "SUMMER_CAP",
            },
        );
        assert!(sql.contains("ON ST_Intersects(d.geom, p.geom)"));
        assert!(sql.contains("WHERE d.\"NAME\"::text = $1::text"));
        assert!(sql.contains("ORDER BY p.\"SUMMER_CAP\" DESC NULLS LAST"));
    }
}
