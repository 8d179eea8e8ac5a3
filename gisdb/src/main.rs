//! Point d'entrée CLI pour gisdb

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

use gisdb::config::AppConfig;
use gisdb::reports::plants::PlantsQuery;
use gisdb::reports::ReportOptions;

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{Commands, ConnectionArgs};

/// Charger des fichiers GeoJSON dans PostGIS et les interroger
#[derive(Parser)]
#[command(name = "gisdb")]
#[command(author, version)]
#[command(about = "Charger des fichiers GeoJSON dans PostGIS et lancer des requêtes spatiales")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    let config = AppConfig::load_optional(cli.config.as_deref())?;
    debug!(ingest = ?config.ingest, "Configuration loaded");

    match cli.command {
        Commands::Inspect { path } => cli::cmd_inspect(&path)?,
        Commands::Ingest {
            path,
            table,
            schema,
            source_srid,
            target_srid,
            yes,
            dry_run,
            all_or_nothing,
            ddl_dir,
            report,
            progress_every,
        } => {
            let request = cli::ingest_request(
                &config,
                path,
                &table,
                schema,
                source_srid,
                target_srid,
                dry_run,
                all_or_nothing,
                ddl_dir,
                progress_every,
            );
            cli::cmd_ingest(&config, &cli.connection, request, yes, report).await?;
        }
        Commands::Tables { table, schema } => {
            cli::cmd_tables(&config, &cli.connection, table.as_deref(), &schema).await?;
        }
        Commands::Plants {
            table,
            schema,
            lon,
            lat,
            radius_km,
            csv_dir,
            geojson_out,
            display_limit,
        } => {
            let schema = schema.unwrap_or_else(|| config.ingest.schema.clone());
            let (center, center_label) = cli::plants_center(lon, lat);
            let query = PlantsQuery {
                center,
                center_label,
                radius_km,
                geojson_out,
                ..PlantsQuery::new(&schema, &table)
            };
            let options = ReportOptions {
                csv_dir,
                display_limit,
            };
            cli::cmd_plants(&config, &cli.connection, query, options).await?;
        }
        Commands::Dams {
            dams_table,
            plants_table,
            dam,
            limit,
            schema,
            csv_dir,
        } => {
            let schema = schema.unwrap_or_else(|| config.ingest.schema.clone());
            let query = cli::dams_query(&schema, dams_table, plants_table, dam.as_deref(), limit);
            let options = ReportOptions {
                csv_dir,
                display_limit: 10,
            };
            cli::cmd_dams(&config, &cli.connection, query, options).await?;
        }
        Commands::Version => cli::cmd_version(&config, &cli.connection).await?,
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
