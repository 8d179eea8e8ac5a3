//! Requêtes d'analyse et mise en forme de leurs résultats
//!
//! Toute requête est enveloppée dans `row_to_json` : chaque ligne revient
//! sous forme d'objet JSON, quels que soient les types PostgreSQL des
//! colonnes (numeric, geometry, json...).

pub mod dams;
pub mod plants;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;
use tracing::{debug, info};

/// Largeur maximale d'une cellule dans la grille
const MAX_CELL_WIDTH: usize = 60;

/// Résultat tabulaire d'une requête
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub description: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl ResultTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Valeur de la première ligne pour une colonne
    pub fn first_value(&self, column: &str) -> Option<&JsonValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.first().map(|row| &row[idx])
    }

    /// Valeurs d'une colonne
    pub fn column_values(&self, column: &str) -> Vec<&JsonValue> {
        match self.columns.iter().position(|c| c == column) {
            Some(idx) => self.rows.iter().map(|row| &row[idx]).collect(),
            None => Vec::new(),
        }
    }

    /// Grille des `limit` premières lignes
    pub fn render_grid(&self, limit: usize) -> String {
        let shown: Vec<Vec<String>> = self
            .rows
            .iter()
            .take(limit)
            .map(|row| row.iter().map(|v| truncate(&cell_text(v))).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &shown {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let border = |left: char, mid: char, right: char| {
            let inner: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
            format!("{}{}{}", left, inner.join(&mid.to_string()), right)
        };
        let line = |cells: &[String]| {
            let inner: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!(" {}{} ", c, " ".repeat(w - c.chars().count())))
                .collect();
            format!("|{}|", inner.join("|"))
        };

        let mut out = String::new();
        let _ = writeln!(out, "{}", border('+', '+', '+'));
        let _ = writeln!(out, "{}", line(self.columns.as_slice()));
        let _ = writeln!(out, "{}", border('|', '+', '|'));
        for row in &shown {
            let _ = writeln!(out, "{}", line(row.as_slice()));
        }
        let _ = write!(out, "{}", border('+', '+', '+'));
        out
    }

    /// Affiche l'en-tête, la requête et les premières lignes
    pub fn display(&self, sql: &str, limit: usize) {
        println!("\n=== {} ===", self.description);
        println!("SQL: {}", sql.trim());
        if self.rows.is_empty() {
            println!("No results returned.");
            return;
        }
        println!(
            "\nResults ({} rows, showing first {}):",
            self.rows.len(),
            limit.min(self.rows.len())
        );
        println!("{}", self.render_grid(limit));
    }

    /// Contenu CSV (en-tête puis lignes)
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        self.write_csv(&mut writer)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }

    fn write_csv<W: std::io::Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(cell_text))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Nom de fichier: `results_<description>_<YYYYmmdd_HHMMSS>.csv`
    pub fn csv_file_name(&self, timestamp: &chrono::DateTime<chrono::Local>) -> String {
        format!(
            "results_{}_{}.csv",
            safe_file_stem(&self.description),
            timestamp.format("%Y%m%d_%H%M%S")
        )
    }

    /// Chemin libre dans `dir`: suffixe `_2`, `_3`... si le nom est déjà pris
    pub fn csv_path(&self, dir: &Path, timestamp: &chrono::DateTime<chrono::Local>) -> PathBuf {
        let name = self.csv_file_name(timestamp);
        let mut path = dir.join(&name);
        let stem = name.trim_end_matches(".csv");
        let mut n = 2;
        while path.exists() {
            path = dir.join(format!("{}_{}.csv", stem, n));
            n += 1;
        }
        path
    }

    /// Sauvegarde en CSV dans `dir`; rien n'est écrit pour un résultat vide
    pub fn save_csv(&self, dir: &Path) -> Result<Option<PathBuf>> {
        if self.rows.is_empty() {
            return Ok(None);
        }
        let path = self.csv_path(dir, &chrono::Local::now());
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_csv(&mut writer)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), rows = self.rows.len(), "Results saved");
        Ok(Some(path))
    }
}

/// Exécute une requête et retourne ses lignes sous forme de table
pub async fn run_query(
    client: &Client,
    description: &str,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> Result<ResultTable> {
    let inner = sql.trim().trim_end_matches(';');
    let statement = client
        .prepare(inner)
        .await
        .with_context(|| format!("Failed to prepare query: {}", description))?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let wrapped = format!("SELECT row_to_json(q)::text FROM ({}) AS q", inner);
    let rows = client
        .query(wrapped.as_str(), params)
        .await
        .with_context(|| format!("Query failed: {}", description))?;

    let rows = rows
        .iter()
        .map(|row| {
            let text: String = row.get(0);
            let object: serde_json::Map<String, JsonValue> = serde_json::from_str(&text)
                .with_context(|| format!("Unexpected row format in: {}", description))?;
            Ok(columns
                .iter()
                .map(|c| object.get(c).cloned().unwrap_or(JsonValue::Null))
                .collect())
        })
        .collect::<Result<Vec<Vec<JsonValue>>>>()?;

    debug!(description, rows = rows.len(), "Query executed");
    Ok(ResultTable {
        description: description.to_string(),
        columns,
        rows,
    })
}

/// Options communes d'affichage et de sauvegarde
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Répertoire des CSV; `None` = pas de sauvegarde
    pub csv_dir: Option<PathBuf>,
    /// Nombre de lignes affichées
    pub display_limit: usize,
}

/// Exécute, affiche et sauvegarde éventuellement une requête
pub async fn run_and_show(
    client: &Client,
    description: &str,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
    options: &ReportOptions,
) -> Result<ResultTable> {
    let table = run_query(client, description, sql, params).await?;
    table.display(sql, options.display_limit.max(1));
    if let Some(dir) = &options.csv_dir {
        if let Some(path) = table.save_csv(dir)? {
            println!("Results saved to: {}", path.display());
        }
    }
    Ok(table)
}

/// Texte d'une cellule: chaîne brute, vide pour NULL, JSON sinon
pub fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.replace('\n', " ");
    }
    let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    format!("{}...", cut.replace('\n', " "))
}

/// Caractères non alphanumériques remplacés par `_`
pub fn safe_file_stem(description: &str) -> String {
    description
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
