use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{PlayLogRepository, Storage, WordRepository};

mod mapping;
mod migrate;
mod play_log_repo;
mod word_repo;

/// Applied to every pooled connection. WAL lets the stats view read while the
/// player records a cycle; the busy timeout covers the brief writer overlap.
const CONNECTION_PRAGMAS: &[&str] = &["PRAGMA journal_mode = WAL;", "PRAGMA busy_timeout = 5000;"];

/// Word list and play log backed by one `SQLite` pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("cannot open word database: {0}")]
    Open(#[source] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migrate(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// # Errors
    ///
    /// Returns `SqliteInitError::Open` if the database cannot be reached or a
    /// connection pragma is rejected.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await
            .map_err(SqliteInitError::Open)?;
        Ok(Self { pool })
    }

    /// Connects and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` from either step.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// # Errors
    ///
    /// Returns `SqliteInitError::Migrate` if a migration statement fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::open(database_url).await?;
        let words: Arc<dyn WordRepository> = Arc::new(repo.clone());
        let play_log: Arc<dyn PlayLogRepository> = Arc::new(repo);
        Ok(Self { words, play_log })
    }
}
