//! Pool de connexions PostgreSQL

use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use std::time::Duration;
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::info;

use crate::config::DatabaseSection;

/// Mode SSL pour la connexion PostgreSQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// Pas de SSL (défaut)
    #[default]
    Disable,
    /// SSL préféré mais non requis
    Prefer,
    /// SSL requis
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" | "yes" => Ok(SslMode::Require),
            _ => Err(format!("Invalid SSL mode: {}. Use: disable, prefer, require", s)),
        }
    }
}

impl SslMode {
    /// Mode transmis à tokio-postgres. Sans lui, le client reste en
    /// `Prefer` et retombe en clair si le serveur refuse TLS.
    pub fn pg_mode(self) -> deadpool_postgres::SslMode {
        match self {
            SslMode::Disable => deadpool_postgres::SslMode::Disable,
            SslMode::Prefer => deadpool_postgres::SslMode::Prefer,
            SslMode::Require => deadpool_postgres::SslMode::Require,
        }
    }
}

/// Configuration de la base de données
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub pool_size: usize,
    pub ssl_mode: SslMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "gisdb".into(),
            user: "postgres".into(),
            password: None,
            // Un script = une connexion
            pool_size: 1,
            ssl_mode: SslMode::Disable,
        }
    }
}

impl DatabaseConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("PGHOST").unwrap_or(defaults.host),
            port: std::env::var("PGPORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("PGDATABASE").unwrap_or(defaults.dbname),
            user: std::env::var("PGUSER").unwrap_or(defaults.user),
            password: std::env::var("PGPASSWORD").ok(),
            pool_size: std::env::var("POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_size),
            ssl_mode: std::env::var("PGSSLMODE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// Applique les valeurs renseignées d'une section de configuration
    /// (fichier JSON ou options CLI).
    pub fn apply(&mut self, overrides: &DatabaseSection) -> Result<()> {
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(dbname) = &overrides.dbname {
            self.dbname = dbname.clone();
        }
        if let Some(user) = &overrides.user {
            self.user = user.clone();
        }
        if let Some(password) = &overrides.password {
            self.password = Some(password.clone());
        }
        if let Some(pool_size) = overrides.pool_size {
            self.pool_size = pool_size.max(1);
        }
        if let Some(ssl) = &overrides.ssl_mode {
            self.ssl_mode = ssl.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Description sans mot de passe, pour l'affichage
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{} (SSL: {:?})",
            self.user, self.host, self.port, self.dbname, self.ssl_mode
        )
    }
}

/// Crée la configuration TLS pour rustls
fn make_tls_connector() -> Result<MakeRustlsConnect> {
    let root_store = rustls::RootCertStore::from_iter(
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned()
    );

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(MakeRustlsConnect::new(config))
}

/// Configuration deadpool équivalente, sans connexion
pub fn pool_config(config: &DatabaseConfig) -> Config {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.dbname = Some(config.dbname.clone());
    cfg.user = Some(config.user.clone());
    cfg.password = config.password.clone();
    cfg.ssl_mode = Some(config.ssl_mode.pg_mode());

    cfg.pool = Some(PoolConfig {
        max_size: config.pool_size,
        timeouts: Timeouts {
            wait: Some(Duration::from_secs(30)),
            create: Some(Duration::from_secs(10)),
            recycle: Some(Duration::from_secs(30)),
        },
        ..Default::default()
    });
    cfg
}

/// Crée un pool de connexions.
///
/// Aucune connexion n'est ouverte ici: la première est établie au premier
/// `pool.get()`.
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool> {
    let cfg = pool_config(config);

    match config.ssl_mode {
        SslMode::Disable => {
            cfg.create_pool(Some(Runtime::Tokio1), NoTls)
                .context("Failed to create database pool")
        }
        SslMode::Prefer | SslMode::Require => {
            let tls = make_tls_connector()?;
            cfg.create_pool(Some(Runtime::Tokio1), tls)
                .context("Failed to create database pool with TLS")
        }
    }
}

/// Vérifie la connexion et retourne la version de PostGIS
pub async fn postgis_version(pool: &Pool) -> Result<String> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    let row = client
        .query_one("SELECT postgis_version()", &[])
        .await
        .context("PostGIS version check failed (is the extension installed?)")?;
    let version: String = row.get(0);

    info!(version = %version, "Connected to PostGIS");
    Ok(version)
}
