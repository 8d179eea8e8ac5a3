//! Définition et implémentation des commandes CLI
//!
//! - `inspect`: analyse d'un GeoJSON (sans DB)
//! - `ingest`: GeoJSON → table PostGIS
//! - `tables`: tables et colonnes de la base
//! - `plants` / `dams`: rapports d'analyse
//! - `version`: version de PostGIS

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use deadpool_postgres::Pool;
use serde_json::json;
use tracing::info;

use gisdb::config::{AppConfig, CommitMode, DatabaseSection};
use gisdb::confirm::{AutoApprove, Confirm, PromptConfirm};
use gisdb::db::{self, catalog, DatabaseConfig};
use gisdb::ingest::{IngestOutcome, IngestRequest};
use gisdb::report::LoadStatus;
use gisdb::reports::dams::{run_dam_reports, DamSelection, DamsQuery};
use gisdb::reports::plants::{run_plant_reports, PlantsQuery, DEFAULT_CENTER, DEFAULT_RADIUS_KM};
use gisdb::reports::{ReportOptions, ResultTable};

/// Paramètres de connexion, communs à toutes les commandes
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// PostgreSQL database name (défaut : env PGDATABASE / gisdb)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long, global = true)]
    pub ssl: Option<String>,
}

impl ConnectionArgs {
    fn to_section(&self) -> DatabaseSection {
        DatabaseSection {
            host: self.host.clone(),
            port: self.port,
            dbname: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            pool_size: None,
            ssl_mode: self.ssl.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse a GeoJSON file (no database required)
    Inspect {
        /// Path to the GeoJSON file
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Load a GeoJSON file into a new PostGIS table
    Ingest {
        /// Path to the GeoJSON file
        #[arg(short, long)]
        path: PathBuf,

        /// Target table name ('-' becomes '_', lowercased)
        #[arg(short, long)]
        table: String,

        /// Target PostgreSQL schema (défaut : config / public)
        #[arg(long)]
        schema: Option<String>,

        /// Source SRID (défaut : crs du fichier, sinon 4326)
        #[arg(long)]
        source_srid: Option<u32>,

        /// Target SRID (défaut : config / 4326)
        #[arg(long)]
        target_srid: Option<u32>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Write the table structure file and stop
        #[arg(long)]
        dry_run: bool,

        /// Roll back the whole load if any feature fails
        #[arg(long)]
        all_or_nothing: bool,

        /// Directory for <table>_table_structure.sql (défaut : config / .)
        #[arg(long)]
        ddl_dir: Option<PathBuf>,

        /// Save the load report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print progress every N inserted features (défaut : config / 100)
        #[arg(long)]
        progress_every: Option<usize>,
    },

    /// List tables, or describe one table
    Tables {
        /// Table to describe
        #[arg(long)]
        table: Option<String>,

        /// Schema of the described table
        #[arg(long, default_value = "public")]
        schema: String,
    },

    /// Run the example queries on a power plants table
    Plants {
        /// Power plants table
        #[arg(long, default_value = "power_plants")]
        table: String,

        /// Schema (défaut : config / public)
        #[arg(long)]
        schema: Option<String>,

        /// Longitude of the search center
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Latitude of the search center
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Search radius in kilometers
        #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
        radius_km: f64,

        /// Save every result as CSV in this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Write the GeoJSON export sample to this file
        #[arg(long)]
        geojson_out: Option<PathBuf>,

        /// Rows shown per result
        #[arg(long, default_value_t = 10)]
        display_limit: usize,
    },

    /// Find power plants inside dam inundation zones
    Dams {
        /// Dams (inundation polygons) table
        #[arg(long, default_value = "utah_dams")]
        dams_table: String,

        /// Power plants table
        #[arg(long, default_value = "power_plants")]
        plants_table: String,

        /// Dam name, or ALL (défaut : le plus grand barrage)
        #[arg(long)]
        dam: Option<String>,

        /// Number of dams listed
        #[arg(long, default_value_t = 50)]
        limit: i64,

        /// Schema (défaut : config / public)
        #[arg(long)]
        schema: Option<String>,

        /// Save every result as CSV in this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },

    /// Check the connection and print the PostGIS version
    Version,
}

/// Configuration de connexion: env, puis fichier, puis options CLI
pub fn database_config(config: &AppConfig, conn: &ConnectionArgs) -> Result<DatabaseConfig> {
    let mut db_config = DatabaseConfig::from_env();
    db_config.apply(&config.database.merged(&conn.to_section()))?;
    Ok(db_config)
}

async fn connect(config: &AppConfig, conn: &ConnectionArgs) -> Result<Pool> {
    let db_config = database_config(config, conn)?;
    println!("Database: {}", db_config.display_target());
    db::create_pool(&db_config).await
}

/// Exécute la commande inspect
pub fn cmd_inspect(path: &Path) -> Result<()> {
    let inspection = geoschema::inspect_path(path)
        .with_context(|| format!("Failed to inspect {}", path.display()))?;
    println!("\n{}", inspection.summary());

    let srid = geoschema::resolve_source_srid(None, &inspection.collection);
    println!("\nSource SRID: {} ({:?})", srid.srid, srid.origin);
    Ok(())
}

/// Exécute la commande ingest
pub async fn cmd_ingest(
    config: &AppConfig,
    conn: &ConnectionArgs,
    mut request: IngestRequest,
    yes: bool,
    report_path: Option<PathBuf>,
) -> Result<()> {
    info!(
        path = %request.path.display(),
        table = %request.table,
        schema = %request.schema,
        dry_run = request.dry_run,
        commit_mode = ?request.commit_mode,
        "Starting ingest"
    );
    request.progress_every = request.progress_every.max(1);

    let pool = connect(config, conn).await?;
    if !request.dry_run {
        let version = db::postgis_version(&pool).await?;
        println!("Connected to PostGIS version: {}", version);
    }

    let mut confirm: Box<dyn Confirm> = if yes {
        Box::new(AutoApprove)
    } else {
        Box::new(PromptConfirm::stdin())
    };

    match gisdb::ingest(&pool, &request, confirm.as_mut()).await? {
        IngestOutcome::DryRun { ddl_path } => {
            println!(
                "Dry run: table structure written to {}, database untouched.",
                ddl_path.display()
            );
        }
        IngestOutcome::Cancelled { .. } => {}
        IngestOutcome::Loaded(report) => {
            report.display();
            if let Some(path) = report_path {
                report.save_to_file(&path)?;
                println!("Report saved to: {}", path.display());
            }
            if report.status == LoadStatus::RolledBack {
                anyhow::bail!(
                    "Load of {} rolled back: {} feature(s) failed",
                    report.table,
                    report.failed.len()
                );
            }
            if report.status == LoadStatus::Failed && report.total > 0 {
                anyhow::bail!("No feature could be inserted into {}", report.table);
            }
        }
    }

    Ok(())
}

/// Construit la requête de chargement à partir de la config et des options
#[allow(clippy::too_many_arguments)]
pub fn ingest_request(
    config: &AppConfig,
    path: PathBuf,
    table: &str,
    schema: Option<String>,
    source_srid: Option<u32>,
    target_srid: Option<u32>,
    dry_run: bool,
    all_or_nothing: bool,
    ddl_dir: Option<PathBuf>,
    progress_every: Option<usize>,
) -> IngestRequest {
    let mut request = IngestRequest::new(path, table, &config.ingest);
    if let Some(schema) = schema {
        request.schema = schema;
    }
    request.source_srid = source_srid;
    if let Some(srid) = target_srid {
        request.target_srid = srid;
    }
    request.dry_run = dry_run;
    if all_or_nothing {
        request.commit_mode = CommitMode::AllOrNothing;
    }
    if let Some(dir) = ddl_dir {
        request.ddl_dir = dir;
    }
    if let Some(every) = progress_every {
        request.progress_every = every;
    }
    request
}

/// Exécute la commande tables
pub async fn cmd_tables(
    config: &AppConfig,
    conn: &ConnectionArgs,
    table: Option<&str>,
    schema: &str,
) -> Result<()> {
    let pool = connect(config, conn).await?;
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    println!("Connected to PostgreSQL database.");

    let Some(table) = table else {
        let tables = catalog::list_tables(&client).await?;
        if tables.is_empty() {
            println!("No tables found in the database.");
            return Ok(());
        }
        let grid = ResultTable {
            description: "Tables".into(),
            columns: vec!["Schema".into(), "Table Name".into()],
            rows: tables
                .into_iter()
                .map(|t| vec![json!(t.schema), json!(t.name)])
                .collect(),
        };
        println!("\nFound {} tables in the database:", grid.rows.len());
        println!("{}", grid.render_grid(usize::MAX));
        return Ok(());
    };

    let columns = catalog::describe_columns(&client, schema, table).await?;
    if columns.is_empty() {
        println!("Table '{}' not found or has no columns.", table);
        return Ok(());
    }

    let grid = ResultTable {
        description: format!("Schema for table '{}'", table),
        columns: vec!["Column".into(), "Data Type".into(), "Nullable".into()],
        rows: columns
            .iter()
            .map(|c| {
                vec![
                    json!(c.name),
                    json!(c.type_label()),
                    json!(if c.nullable { "YES" } else { "NO" }),
                ]
            })
            .collect(),
    };
    println!("\n{}:", grid.description);
    println!("{}", grid.render_grid(usize::MAX));

    let geometry = catalog::geometry_columns(&client, schema, table).await?;
    if !geometry.is_empty() {
        let grid = ResultTable {
            description: "Geometry Information".into(),
            columns: vec![
                "Geometry Column".into(),
                "Type".into(),
                "SRID".into(),
                "Dimensions".into(),
            ],
            rows: geometry
                .iter()
                .map(|g| {
                    vec![
                        json!(g.column),
                        json!(g.geometry_type),
                        json!(g.srid),
                        json!(g.dimensions),
                    ]
                })
                .collect(),
        };
        println!("\n{}:", grid.description);
        println!("{}", grid.render_grid(usize::MAX));
    }

    let count = catalog::row_count(&client, schema, table).await?;
    println!("\nTotal rows: {}", count);
    Ok(())
}

/// Exécute la commande plants
pub async fn cmd_plants(
    config: &AppConfig,
    conn: &ConnectionArgs,
    query: PlantsQuery,
    options: ReportOptions,
) -> Result<()> {
    let pool = connect(config, conn).await?;
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    let results = run_plant_reports(&client, &query, &options).await?;
    info!(queries = results.len(), "Plant reports completed");
    Ok(())
}

/// Centre de recherche: coordonnées fournies ou Chicago
pub fn plants_center(lon: Option<f64>, lat: Option<f64>) -> ((f64, f64), String) {
    match (lon, lat) {
        (Some(lon), Some(lat)) => ((lon, lat), format!("({}, {})", lon, lat)),
        _ => (DEFAULT_CENTER, "Chicago".into()),
    }
}

/// Exécute la commande dams
pub async fn cmd_dams(
    config: &AppConfig,
    conn: &ConnectionArgs,
    query: DamsQuery,
    options: ReportOptions,
) -> Result<()> {
    let pool = connect(config, conn).await?;
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    let reports = run_dam_reports(&client, &query, &options).await?;
    info!(dams = reports.len(), "Dam reports completed");
    Ok(())
}

/// Construit la requête barrages
pub fn dams_query(
    schema: &str,
    dams_table: String,
    plants_table: String,
    dam: Option<&str>,
    limit: i64,
) -> DamsQuery {
    DamsQuery {
        dams_table,
        plants_table,
        limit: limit.max(1),
        selection: DamSelection::parse(dam),
        ..DamsQuery::new(schema)
    }
}

/// Exécute la commande version
pub async fn cmd_version(config: &AppConfig, conn: &ConnectionArgs) -> Result<()> {
    let pool = connect(config, conn).await?;
    let version = db::postgis_version(&pool).await?;
    println!("Connected to PostGIS version: {}", version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_parse_ingest() {
        let cli = TestCli::try_parse_from([
            "gisdb",
            "ingest",
            "--path",
            "dams.geojson",
            "--table",
            "utah-dams",
            "--source-srid",
            "26912",
            "--all-or-nothing",
            "--yes",
            "--host",
            "db.local",
        ])
        .unwrap();

        assert_eq!(cli.connection.host.as_deref(), Some("db.local"));
        match cli.command {
            Commands::Ingest {
                table,
                source_srid,
                all_or_nothing,
                yes,
                dry_run,
                ..
            } => {
                assert_eq!(table, "utah-dams");
                assert_eq!(source_srid, Some(26912));
                assert!(all_or_nothing);
                assert!(yes);
                assert!(!dry_run);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_parse_plants_negative_lon() {
        let cli = TestCli::try_parse_from([
            "gisdb", "plants", "--lon", "-111.89", "--lat", "40.76", "--radius-km", "50",
        ])
        .unwrap();
        match cli.command {
            Commands::Plants {
                lon, lat, radius_km, ..
            } => {
                assert_eq!(lon, Some(-111.89));
                assert_eq!(lat, Some(40.76));
                assert_eq!(radius_km, 50.0);
            }
            _ => panic!("expected plants"),
        }
    }

    #[test]
    fn test_plants_lon_requires_lat() {
        assert!(TestCli::try_parse_from(["gisdb", "plants", "--lon", "-111.89"]).is_err());
    }

    #[test]
    fn test_ingest_request_overrides() {
        let config = AppConfig::default();
        let request = ingest_request(
            &config,
            PathBuf::from("a.geojson"),
            "a",
            Some("staging".into()),
            None,
            Some(3857),
            true,
            true,
            None,
            Some(10),
        );
        assert_eq!(request.schema, "staging");
        assert_eq!(request.source_srid, None);
        assert_eq!(request.target_srid, 3857);
        assert!(request.dry_run);
        assert_eq!(request.commit_mode, CommitMode::AllOrNothing);
        assert_eq!(request.ddl_dir, PathBuf::from("."));
        assert_eq!(request.progress_every, 10);
    }

    #[test]
    fn test_database_config_precedence() {
        let config = AppConfig {
            database: DatabaseSection {
                host: Some("file-host".into()),
                dbname: Some("file-db".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let conn = ConnectionArgs {
            host: Some("cli-host".into()),
            ..Default::default()
        };

        let db_config = database_config(&config, &conn).unwrap();
        assert_eq!(db_config.host, "cli-host");
        assert_eq!(db_config.dbname, "file-db");
    }

    #[test]
    fn test_plants_center() {
        let (center, label) = plants_center(None, None);
        assert_eq!(center, DEFAULT_CENTER);
        assert_eq!(label, "Chicago");

        let (center, label) = plants_center(Some(-111.0), Some(40.0));
        assert_eq!(center, (-111.0, 40.0));
        assert_eq!(label, "(-111, 40)");
    }

    #[test]
    fn test_dams_query() {
        let query = dams_query("public", "dams".into(), "plants".into(), Some("all"), 0);
        assert_eq!(query.selection, DamSelection::All);
        assert_eq!(query.limit, 1);
        assert_eq!(query.dams_table, "dams");
    }
}
