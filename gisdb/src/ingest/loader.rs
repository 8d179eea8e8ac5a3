//! Insertion des features, une ligne par savepoint

use anyhow::{Context, Result};
use geojson::Feature;
use geoschema::TableSchema;
use tracing::{debug, warn};

use super::row::{row_values, Srids};
use super::transaction::TableLoad;
use crate::report::{FailureKind, LoadReport};

/// Options d'insertion
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Intervalle de progression, en lignes insérées
    pub progress_every: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { progress_every: 100 }
    }
}

const ROW_SAVEPOINT: &str = "feature_row";
const PREPARE_SAVEPOINT: &str = "insert_statement";

/// Cadence des lignes de progression
#[derive(Debug, Clone, Copy)]
pub struct ProgressTicker {
    every: usize,
    last: Option<usize>,
}

impl ProgressTicker {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            last: None,
        }
    }

    /// Après une insertion: `true` si une ligne doit être émise
    pub fn on_insert(&mut self, inserted: usize) -> bool {
        if inserted % self.every == 0 {
            self.last = Some(inserted);
            true
        } else {
            false
        }
    }

    /// En fin de chargement: `true` sauf si ce total vient d'être émis
    pub fn on_finish(&mut self, inserted: usize) -> bool {
        if self.last == Some(inserted) {
            false
        } else {
            self.last = Some(inserted);
            true
        }
    }
}

/// Insère toutes les features dans la table.
///
/// Chaque ligne est exécutée dans un savepoint: une erreur PostgreSQL est
/// annulée au niveau de la ligne sans invalider la transaction. Les lignes
/// rejetées sont consignées dans `report` et ignorées.
///
/// `on_progress(inserted, total)` est appelé toutes les
/// `progress_every` lignes insérées, puis une dernière fois à la fin.
///
/// Si la requête d'insertion ne peut pas être préparée (table existante
/// aux colonnes différentes par exemple), chaque feature est consignée en
/// échec avec le message de PostgreSQL.
///
/// Retourne une erreur seulement si la connexion elle-même devient
/// inutilisable.
pub async fn load_features(
    load: &mut TableLoad<'_>,
    schema: &TableSchema,
    features: &[Feature],
    srids: Srids,
    options: LoadOptions,
    report: &mut LoadReport,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<()> {
    let total = features.len();
    let mut ticker = ProgressTicker::new(options.progress_every);

    let statement = {
        let savepoint = load
            .transaction_mut()
            .savepoint(PREPARE_SAVEPOINT)
            .await
            .context("Failed to open prepare savepoint")?;
        match savepoint.prepare(&schema.insert_sql()).await {
            Ok(statement) => {
                savepoint
                    .commit()
                    .await
                    .context("Failed to release prepare savepoint")?;
                statement
            }
            Err(e) if e.is_closed() => {
                return Err(e).context("Connection lost while preparing insert");
            }
            Err(e) => {
                let message = db_message(&e);
                warn!(
                    table = %schema.qualified_name(),
                    error = %message,
                    "Insert statement rejected, every feature fails"
                );
                savepoint
                    .rollback()
                    .await
                    .context("Failed to roll back prepare savepoint")?;
                for index in 0..total {
                    report.record_failure(index, FailureKind::Database, message.clone());
                }
                if ticker.on_finish(report.inserted) {
                    on_progress(report.inserted, total);
                }
                return Ok(());
            }
        }
    };

    for (index, feature) in features.iter().enumerate() {
        let row = match row_values(schema, feature) {
            Ok(row) => row,
            Err(e) => {
                warn!(index, error = %e, "Skipping feature");
                report.record_failure(index, FailureKind::Client, e.to_string());
                continue;
            }
        };
        let params = row.params(&srids);

        let savepoint = load
            .transaction_mut()
            .savepoint(ROW_SAVEPOINT)
            .await
            .context("Failed to open row savepoint")?;

        match savepoint.execute(&statement, &params).await {
            Ok(_) => {
                savepoint
                    .commit()
                    .await
                    .context("Failed to release row savepoint")?;
                report.record_insert();

                if ticker.on_insert(report.inserted) {
                    on_progress(report.inserted, total);
                }
            }
            Err(e) if e.is_closed() => {
                return Err(e).context("Connection lost while inserting features");
            }
            Err(e) => {
                let message = db_message(&e);
                warn!(index, error = %message, "Error inserting feature");

                savepoint
                    .rollback()
                    .await
                    .context("Failed to roll back row savepoint")?;
                report.record_failure(index, FailureKind::Database, message);
            }
        }
    }

    if ticker.on_finish(report.inserted) {
        on_progress(report.inserted, total);
    }

    debug!(
        inserted = report.inserted,
        failed = report.failed.len(),
        "Features processed"
    );
    Ok(())
}

fn db_message(e: &tokio_postgres::Error) -> String {
    e.as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(every: usize, outcomes: &[bool]) -> Vec<usize> {
        let mut ticker = ProgressTicker::new(every);
        let mut inserted = 0;
        let mut emitted = Vec::new();
        for &ok in outcomes {
            if ok {
                inserted += 1;
                if ticker.on_insert(inserted) {
                    emitted.push(inserted);
                }
            }
        }
        if ticker.on_finish(inserted) {
            emitted.push(inserted);
        }
        emitted
    }

    #[test]
    fn test_progress_every_hundred_and_at_end() {
        assert_eq!(ticks(100, &[true; 250]), vec![100, 200, 250]);
    }

    #[test]
    fn test_progress_final_line_not_repeated() {
        assert_eq!(ticks(100, &[true; 200]), vec![100, 200]);

        // 201 lignes dont une rejetée: 200 insérées, dernière ligne déjà émise
        let mut outcomes = vec![true; 201];
        outcomes[57] = false;
        assert_eq!(ticks(100, &outcomes), vec![100, 200]);
    }

    #[test]
    fn test_progress_empty_and_zero_interval() {
        assert_eq!(ticks(100, &[]), vec![0]);
        assert_eq!(ticks(0, &[true; 3]), vec![1, 2, 3]);
    }
}
