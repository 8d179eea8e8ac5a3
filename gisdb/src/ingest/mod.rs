//! Chargement d'un fichier GeoJSON dans une table PostGIS
//!
//! Déroulé linéaire: inspection, synthèse du schéma, écriture du DDL,
//! confirmation, création de la table, insertion, rapport. La création et
//! les insertions partagent une transaction, validée une seule fois.

pub mod loader;
pub mod row;
pub mod transaction;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use geoschema::ident::sanitize_table_name;
use geoschema::{inspect_path, resolve_source_srid, Inspection, SridOrigin, TableSchema};
use tracing::{info, warn};

use crate::config::{CommitMode, IngestSection};
use crate::confirm::Confirm;
use crate::report::{progress_line, LoadReport};

pub use loader::{load_features, LoadOptions};
pub use row::{row_values, RowError, RowValues, Srids};
pub use transaction::TableLoad;

/// Texte de la question posée avant toute modification
pub const CONFIRM_PROMPT: &str = "Do you want to create the table and insert data?";

/// Paramètres d'un chargement
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub path: PathBuf,
    /// Nom de table brut, normalisé avant usage
    pub table: String,
    pub schema: String,
    /// SRID source imposé; sinon détecté dans le document, sinon 4326
    pub source_srid: Option<u32>,
    pub target_srid: u32,
    pub commit_mode: CommitMode,
    /// Répertoire du fichier `<table>_table_structure.sql`
    pub ddl_dir: PathBuf,
    /// Écrit le DDL sans toucher à la base
    pub dry_run: bool,
    pub progress_every: usize,
}

impl IngestRequest {
    /// Requête avec les valeurs par défaut de la section `ingest`
    pub fn new(path: impl Into<PathBuf>, table: &str, defaults: &IngestSection) -> Self {
        Self {
            path: path.into(),
            table: table.to_string(),
            schema: defaults.schema.clone(),
            source_srid: None,
            target_srid: defaults.target_srid,
            commit_mode: defaults.commit_mode,
            ddl_dir: defaults.ddl_dir.clone(),
            dry_run: false,
            progress_every: defaults.progress_every,
        }
    }
}

/// Issue d'un chargement
#[derive(Debug)]
pub enum IngestOutcome {
    /// DDL écrit, base non modifiée
    DryRun { ddl_path: PathBuf },
    /// Refusé à la confirmation
    Cancelled { ddl_path: PathBuf },
    /// Chargement effectué (commité ou annulé selon le rapport)
    Loaded(LoadReport),
}

/// Schéma de table et DDL préparés, avant toute connexion
#[derive(Debug)]
pub struct PreparedLoad {
    pub inspection: Inspection,
    pub schema: TableSchema,
    pub source_srid: u32,
    pub ddl_path: PathBuf,
}

/// Inspecte le fichier, synthétise le schéma et écrit le DDL
pub fn prepare(request: &IngestRequest) -> Result<PreparedLoad> {
    let inspection = inspect_path(&request.path)
        .with_context(|| format!("Failed to inspect {}", request.path.display()))?;
    println!("\n{}", inspection.summary());

    let table = sanitize_table_name(&request.table)
        .with_context(|| format!("Invalid table name: {:?}", request.table))?;

    let srid = resolve_source_srid(request.source_srid, &inspection.collection);
    match srid.origin {
        SridOrigin::Explicit => {}
        SridOrigin::Detected => println!("Detected source SRID: {}", srid.srid),
        SridOrigin::Defaulted => println!(
            "No CRS specified in GeoJSON. Assuming EPSG:{}",
            srid.srid
        ),
    }
    if srid.srid == geoschema::DEFAULT_SRID
        && inspection.extent.is_some_and(|e| e.looks_projected())
    {
        warn!(
            srid = srid.srid,
            "Coordinates fall outside the longitude/latitude range; pass --source-srid if the data is projected"
        );
    }

    let schema = TableSchema::from_properties(
        &request.schema,
        &table,
        &inspection.properties,
        inspection.geometry_type,
        request.target_srid,
    )
    .context("Failed to build table schema")?;

    println!("\nProposed table structure:");
    println!("{}", schema.create_table_sql());
    println!("Source SRID: {}, Target SRID: {}", srid.srid, request.target_srid);

    let ddl_path = write_ddl(&schema, &request.ddl_dir)?;

    Ok(PreparedLoad {
        inspection,
        schema,
        source_srid: srid.srid,
        ddl_path,
    })
}

fn write_ddl(schema: &TableSchema, dir: &Path) -> Result<PathBuf> {
    let path = schema
        .write_ddl(dir)
        .context("Failed to write table structure")?;
    println!("Table structure saved to: {}", path.display());
    Ok(path)
}

/// Chargement complet d'un fichier
pub async fn ingest(
    pool: &Pool,
    request: &IngestRequest,
    confirm: &mut dyn Confirm,
) -> Result<IngestOutcome> {
    let prepared = prepare(request)?;

    if request.dry_run {
        info!(path = %prepared.ddl_path.display(), "Dry run, database left untouched");
        return Ok(IngestOutcome::DryRun {
            ddl_path: prepared.ddl_path,
        });
    }

    if !confirm.confirm(CONFIRM_PROMPT)? {
        println!("Operation cancelled by user.");
        return Ok(IngestOutcome::Cancelled {
            ddl_path: prepared.ddl_path,
        });
    }

    let report = execute(pool, &prepared, request).await?;
    Ok(IngestOutcome::Loaded(report))
}

/// Crée la table et insère les features d'un chargement préparé
pub async fn execute(
    pool: &Pool,
    prepared: &PreparedLoad,
    request: &IngestRequest,
) -> Result<LoadReport> {
    let start = Instant::now();
    let schema = &prepared.schema;
    let features = prepared.inspection.features();
    let srids = Srids::new(prepared.source_srid, schema.target_srid)?;

    let mut client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    let qualified = schema.qualified_name();
    let mut load = TableLoad::begin(&mut client, &qualified).await?;

    if let Err(e) = load.create_table(schema).await {
        load.rollback(&e.to_string()).await;
        return Err(e);
    }

    println!("\nInserting {} features into the database...", features.len());

    let mut report = LoadReport::new(
        &qualified,
        features.len(),
        prepared.source_srid,
        schema.target_srid,
    );
    report.commit_mode = request.commit_mode;

    let options = LoadOptions {
        progress_every: request.progress_every,
    };
    let loaded = load_features(&mut load, schema, features, srids, options, &mut report, |i, total| {
        println!("{}", progress_line(i, total))
    })
    .await;

    if let Err(e) = loaded {
        load.rollback(&e.to_string()).await;
        return Err(e);
    }

    report.finalize();
    if request.commit_mode == CommitMode::AllOrNothing && !report.failed.is_empty() {
        load.rollback(&format!("{} feature(s) failed", report.failed.len()))
            .await;
        report.mark_rolled_back();
    } else {
        load.commit().await?;
    }
    report.set_duration(start.elapsed());

    println!("\n{}", report.summary());
    if report.inserted > 0 {
        println!(
            "Data was automatically transformed from EPSG:{} to EPSG:{}",
            report.source_srid, report.target_srid
        );
    }

    info!(
        table = %report.table,
        inserted = report.inserted,
        failed = report.failed.len(),
        status = ?report.status,
        "Load finished"
    );
    Ok(report)
}
