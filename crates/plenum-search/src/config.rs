//! Service configuration.
//!
//! Loaded from an optional YAML file; every section falls back to its
//! defaults when absent. Database credentials can be overridden through the
//! environment (`DATABASE_URL` wins over everything, `DATABASE_PASSWORD`
//! over the configured password).
//!
//! ```yaml
//! index:
//!   file: plenum.index
//!   batch: 1024
//!   age: 2
//! models:
//!   search: models/search.yml
//! http:
//!   listen: 0.0.0.0:9050
//! database:
//!   host: localhost
//!   port: 5432
//!   user: postgres
//!   name: plenum
//! ```

use std::path::{Path, PathBuf};

use plenum_core::Error;
use serde::{Deserialize, Serialize};

/// Index store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Path of the on-disk index; removed and recreated on startup.
    #[serde(default = "default_index_file")]
    pub file: PathBuf,
    /// Mutations per committed batch.
    #[serde(default = "default_batch")]
    pub batch: usize,
    /// Minimum seconds between two update cycles.
    #[serde(default = "default_age")]
    pub age: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            file: default_index_file(),
            batch: default_batch(),
            age: default_age(),
        }
    }
}

/// Collection model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Path of the searchable-fields model file.
    #[serde(default = "default_models_search")]
    pub search: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            search: default_models_search(),
        }
    }
}

/// HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listen address.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Host name.
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Port.
    #[serde(default = "default_db_port")]
    pub port: u16,
    /// User.
    #[serde(default = "default_db_user")]
    pub user: String,
    /// Password; `DATABASE_PASSWORD` overrides.
    #[serde(default)]
    pub password: String,
    /// Database name.
    #[serde(default = "default_db_name")]
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            name: default_db_name(),
        }
    }
}

/// The full service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Index store settings.
    #[serde(default)]
    pub index: IndexConfig,
    /// Collection model settings.
    #[serde(default)]
    pub models: ModelsConfig,
    /// HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load the configuration, from a file if one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|err| {
                    Error::Config(format!("reading config file {path:?} failed: {err}"))
                })?;
                serde_yaml::from_str(&content).map_err(|err| {
                    Error::Config(format!("parsing config file {path:?} failed: {err}"))
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.index.batch == 0 {
            return Err(Error::Config("index.batch must be positive".to_string()));
        }
        Ok(())
    }

    /// Connection URL for the source database.
    ///
    /// `DATABASE_URL` overrides the assembled URL, `DATABASE_PASSWORD` the
    /// configured password.
    pub fn database_url(&self) -> String {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            return url;
        }
        let db = &self.database;
        let password = std::env::var("DATABASE_PASSWORD").unwrap_or_else(|_| db.password.clone());
        format!(
            "postgres://{}:{}@{}:{}/{}",
            db.user, password, db.host, db.port, db.name
        )
    }
}

fn default_index_file() -> PathBuf {
    PathBuf::from("plenum.index")
}

fn default_batch() -> usize {
    1024
}

fn default_age() -> u64 {
    2
}

fn default_models_search() -> PathBuf {
    PathBuf::from("models/search.yml")
}

fn default_listen() -> String {
    "0.0.0.0:9050".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_name() -> String {
    "plenum".to_string()
}

// ============================================================================
// Tests
// ============================================================================
