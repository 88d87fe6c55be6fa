use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub const DEFAULT_DATABASE_URL: &str = "sqlite://vitals-agent.db";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            busy_timeout_secs: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    #[error("Invalid database configuration: {0}")]
    InvalidConfig(String),

    #[error("Database is not ready: migrations have not been run")]
    NotReady,
}

/// Pooled handle to the agent's local sqlite file.
///
/// The handle refuses to serve the metric store until [`Database::run_migrations`]
/// has completed at least once on it (or on any of its clones).
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    migrated: Arc<AtomicBool>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        info!(url = %config.url, "Connecting to database...");

        if !config.url.starts_with("sqlite:") {
            return Err(DatabaseError::InvalidConfig(format!(
                "expected a sqlite: URL, got '{}'",
                config.url
            )));
        }

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DatabaseError::InvalidConfig(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        info!("Database connection pool established");

        Ok(Self {
            pool,
            migrated: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn connect_with_url(url: &str) -> Result<Self, DatabaseError> {
        let config = DatabaseConfig {
            url: url.to_string(),
            ..Default::default()
        };
        Self::connect(&config).await
    }

    /// Applies pending migrations. Safe to call on every startup.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        info!("Running database migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(DatabaseError::MigrationFailed)?;

        self.migrated.store(true, Ordering::SeqCst);
        info!("Database migrations completed successfully");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.migrated.load(Ordering::SeqCst)
    }

    pub fn ensure_ready(&self) -> Result<(), DatabaseError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(DatabaseError::NotReady)
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        info!("Closing database connection pool...");
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

pub async fn init_database(config: &DatabaseConfig) -> Result<Database, DatabaseError> {
    let db = Database::connect(config).await?;
    db.run_migrations().await?;
    Ok(db)
}
