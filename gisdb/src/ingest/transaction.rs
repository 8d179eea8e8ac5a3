//! Transaction de chargement d'une table
//!
//! La création de la table et toutes les insertions partagent une seule
//! transaction; le rollback est automatique si elle est droppée.

use anyhow::{Context, Result};
use deadpool_postgres::{Object, Transaction};
use geoschema::TableSchema;
use tracing::{error, info};

/// Transaction ouverte pour le chargement d'une table
pub struct TableLoad<'a> {
    transaction: Transaction<'a>,
    table: String,
}

impl<'a> TableLoad<'a> {
    /// Démarre la transaction
    pub async fn begin(client: &'a mut Object, table: &str) -> Result<Self> {
        let transaction = client
            .transaction()
            .await
            .context("Failed to begin transaction")?;

        info!(table = %table, "Starting load transaction");

        Ok(Self {
            transaction,
            table: table.to_string(),
        })
    }

    /// Accède à la transaction sous-jacente
    pub fn transaction(&self) -> &Transaction<'a> {
        &self.transaction
    }

    /// Accès mutable, requis pour ouvrir des savepoints
    pub fn transaction_mut(&mut self) -> &mut Transaction<'a> {
        &mut self.transaction
    }

    /// Exécute le DDL de la table (`CREATE TABLE IF NOT EXISTS`)
    pub async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        self.transaction
            .batch_execute(&schema.create_table_sql())
            .await
            .with_context(|| format!("Failed to create table {}", schema.qualified_name()))?;

        info!(table = %self.table, "Table created (if not exists)");
        Ok(())
    }

    /// Valide la transaction
    pub async fn commit(self) -> Result<()> {
        self.transaction
            .commit()
            .await
            .context("Failed to commit transaction")?;

        info!(table = %self.table, "Load committed");
        Ok(())
    }

    /// Annule la transaction
    pub async fn rollback(self, reason: &str) {
        error!(table = %self.table, reason = %reason, "Rolling back load");

        if let Err(e) = self.transaction.rollback().await {
            error!(error = %e, "Explicit rollback failed (will rollback on drop anyway)");
        }
    }
}
