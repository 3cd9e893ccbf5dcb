use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, StorageError};

pub mod feedback;
pub mod report;
pub mod toggle;

/// Storage backend selection and connection parameters, deserialized from the
/// `[storage]` section of the service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default = "default_sqlite_data_source")]
    pub sqlite_data_source: String,
    #[serde(default)]
    pub pg_username: String,
    #[serde(default)]
    pub pg_password: String,
    #[serde(default = "default_pg_host")]
    pub pg_host: String,
    #[serde(default = "default_pg_port")]
    pub pg_port: u16,
    #[serde(default)]
    pub pg_db_name: String,
    #[serde(default)]
    pub pg_params: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            sqlite_data_source: default_sqlite_data_source(),
            pg_username: String::new(),
            pg_password: String::new(),
            pg_host: default_pg_host(),
            pg_port: default_pg_port(),
            pg_db_name: String::new(),
            pg_params: String::new(),
        }
    }
}

impl StorageConfig {
    /// In-memory SQLite instance, used by tests.
    pub fn in_memory() -> Self {
        Self {
            sqlite_data_source: ":memory:".to_string(),
            ..Self::default()
        }
    }

    fn connection_url(&self) -> Result<String> {
        match self.driver.as_str() {
            "sqlite" => {
                if self.sqlite_data_source == ":memory:" {
                    Ok("sqlite::memory:".to_string())
                } else {
                    Ok(format!("sqlite://{}?mode=rwc", self.sqlite_data_source))
                }
            }
            "postgres" => {
                let mut url = format!(
                    "postgres://{}:{}@{}:{}/{}",
                    self.pg_username, self.pg_password, self.pg_host, self.pg_port, self.pg_db_name
                );
                if !self.pg_params.is_empty() {
                    url.push('?');
                    url.push_str(&self.pg_params);
                }
                Ok(url)
            }
            other => Err(StorageError::UnsupportedDriver(other.to_string())),
        }
    }
}

fn default_driver() -> String {
    "sqlite".to_string()
}

fn default_sqlite_data_source() -> String {
    "data/aggregator.db".to_string()
}

fn default_pg_host() -> String {
    "localhost".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

/// Uniform persistence interface over the SQLite and PostgreSQL drivers.
///
/// Holds the single connection pool of the process; safe to share behind an
/// `Arc` between the consumer write path and the HTTP read path.
#[derive(Debug)]
pub struct Storage {
    db: DatabaseConnection,
    backend: DbBackend,
    closed: AtomicBool,
}

impl Storage {
    /// Connects to the configured backend. Fails with
    /// [`StorageError::UnsupportedDriver`] for a driver outside
    /// {"sqlite", "postgres"}.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let url = config.connection_url()?;
        let mut options = ConnectOptions::new(url);
        if config.driver == "sqlite" && config.sqlite_data_source == ":memory:" {
            // A pooled in-memory SQLite database exists per connection;
            // a single connection keeps every caller on the same instance.
            options.max_connections(1);
        }
        let db = Database::connect(options).await?;
        let backend = db.get_database_backend();
        Ok(Self {
            db,
            backend,
            closed: AtomicBool::new(false),
        })
    }

    /// Creates or migrates the schema. Idempotent.
    pub async fn init(&self) -> Result<()> {
        self.ensure_open()?;
        if self.backend == DbBackend::Sqlite {
            self.db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }
        Migrator::up(&self.db, None).await?;
        tracing::info!(driver = ?self.backend, "storage initialized");
        Ok(())
    }

    /// Releases the connection pool. Any further call on this instance
    /// fails with [`StorageError::Closed`].
    pub async fn close(&self) -> Result<()> {
        self.ensure_open()?;
        self.closed.store(true, Ordering::SeqCst);
        self.db.clone().close().await?;
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub(crate) fn backend(&self) -> DbBackend {
        self.backend
    }
}

/// Returns the positional placeholder for `n` (1-based) in the given
/// dialect, so each upsert is written once and parameterized per driver.
pub(crate) fn placeholder(backend: DbBackend, n: usize) -> Result<String> {
    match backend {
        DbBackend::Sqlite => Ok(format!("?{n}")),
        DbBackend::Postgres => Ok(format!("${n}")),
        other => Err(StorageError::UnsupportedDriver(format!("{other:?}"))),
    }
}
