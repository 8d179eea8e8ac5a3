//! Rapport de chargement
//!
//! Collecte les lignes insérées et les échecs ligne à ligne, puis les
//! affiche ou les sauvegarde en JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::CommitMode;

/// Statut global du chargement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    /// Toutes les lignes insérées
    Success,
    /// Lignes insérées et commitées malgré des échecs
    PartialSuccess,
    /// Transaction annulée
    RolledBack,
    /// Aucune ligne insérée
    Failed,
}

/// Origine d'un échec de ligne
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Rejetée avant envoi (valeur imbriquée, colonne inconnue, géométrie absente)
    Client,
    /// Rejetée par PostgreSQL
    Database,
}

/// Échec d'une ligne
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    /// Position de la feature dans la collection
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// Rapport complet d'un chargement
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Table cible qualifiée
    pub table: String,
    pub total: usize,
    pub inserted: usize,
    pub failed: Vec<RowFailure>,
    pub status: LoadStatus,
    pub commit_mode: CommitMode,
    pub source_srid: u32,
    pub target_srid: u32,
    pub duration_secs: f64,
}

impl LoadReport {
    pub fn new(table: &str, total: usize, source_srid: u32, target_srid: u32) -> Self {
        Self {
            table: table.to_string(),
            total,
            inserted: 0,
            failed: Vec::new(),
            status: LoadStatus::Success,
            commit_mode: CommitMode::default(),
            source_srid,
            target_srid,
            duration_secs: 0.0,
        }
    }

    /// Enregistre une ligne insérée
    pub fn record_insert(&mut self) {
        self.inserted += 1;
    }

    /// Enregistre une ligne en échec
    pub fn record_failure(&mut self, index: usize, kind: FailureKind, message: impl Into<String>) {
        self.failed.push(RowFailure {
            index,
            kind,
            message: message.into(),
        });
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.failed.is_empty() {
            LoadStatus::Success
        } else if self.inserted > 0 {
            LoadStatus::PartialSuccess
        } else {
            LoadStatus::Failed
        };
    }

    /// Marque le chargement comme annulé; plus rien n'est en base
    pub fn mark_rolled_back(&mut self) {
        self.inserted = 0;
        self.status = LoadStatus::RolledBack;
    }

    /// Affichage compact: `Completed: X out of Y features inserted successfully.`
    pub fn summary(&self) -> String {
        format!(
            "Completed: {} out of {} features inserted successfully.",
            self.inserted, self.total
        )
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("LOAD REPORT - {}", self.table);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Commit mode: {:?}", self.commit_mode);
        println!("Duration: {:.2}s", self.duration_secs);
        println!("SRID: {} -> {}", self.source_srid, self.target_srid);

        println!("\n--- SUMMARY ---");
        println!(
            "Features: {} total, {} inserted, {} failed",
            self.total,
            self.inserted,
            self.failed.len()
        );

        if !self.failed.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.failed.len());
            for f in self.failed.iter().take(20) {
                println!("  [#{}] {:?} {}", f.index, f.kind, f.message);
            }
            if self.failed.len() > 20 {
                println!("  ... and {} more", self.failed.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }
}

/// Ligne de progression; le pourcentage est tronqué
pub fn progress_line(inserted: usize, total: usize) -> String {
    let percent = if total == 0 { 100 } else { inserted * 100 / total };
    format!(
        "Progress: {}/{} features inserted ({}%)",
        inserted, total, percent
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report() {
        let report = LoadReport::new("\"public\".\"pts\"", 3, 3857, 4326);
        assert_eq!(report.status, LoadStatus::Success);
        assert_eq!(report.inserted, 0);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_summary_partial() {
        let mut report = LoadReport::new("t", 3, 4326, 4326);
        report.record_insert();
        report.record_failure(1, FailureKind::Client, "nested value");
        report.record_insert();
        report.finalize();

        assert_eq!(report.status, LoadStatus::PartialSuccess);
        assert_eq!(report.inserted + report.failed.len(), 3);
        assert_eq!(
            report.summary(),
            "Completed: 2 out of 3 features inserted successfully."
        );
    }

    #[test]
    fn test_finalize_failed() {
        let mut report = LoadReport::new("t", 1, 4326, 4326);
        report.record_failure(0, FailureKind::Database, "invalid geometry");
        report.finalize();
        assert_eq!(report.status, LoadStatus::Failed);
    }

    #[test]
    fn test_rolled_back() {
        let mut report = LoadReport::new("t", 2, 4326, 4326);
        report.record_insert();
        report.record_failure(1, FailureKind::Database, "boom");
        report.mark_rolled_back();
        assert_eq!(report.status, LoadStatus::RolledBack);
        assert_eq!(
            report.summary(),
            "Completed: 0 out of 2 features inserted successfully."
        );
    }

    #[test]
    fn test_progress_line() {
        assert_eq!(progress_line(100, 300), "Progress: 100/300 features inserted (33%)");
        assert_eq!(progress_line(3, 3), "Progress: 3/3 features inserted (100%)");
        assert_eq!(progress_line(0, 0), "Progress: 0/0 features inserted (100%)");
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut report = LoadReport::new("t", 1, 4326, 4326);
        report.record_insert();
        report.finalize();
        report.save_to_file(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["inserted"], 1);
        assert_eq!(json["status"], "Success");
        assert_eq!(json["commit_mode"], "best-effort");
    }
}
