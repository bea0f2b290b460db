//! # Connection Pool
//!
//! [`Database`] owns the SQLite pool and hands out repositories. Both
//! binaries and the integration tests start here.
//!
//! ## Who Opens What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cash-audit      DbConfig::new(config.database.path)                    │
//! │                    .max_connections(config.database.max_connections)   │
//! │  seed            DbConfig::new("./comanda_dev.db")                      │
//! │  tests           DbConfig::in_memory()   one connection, never idle     │
//! │                                                                         │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Database::new   connect → migrate → verify_schema                      │
//! │        │                                                                │
//! │        ├── stores()  shifts()  orders()  invoices()  cash_audits()      │
//! │        └── close()   on the way out of a binary                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! File databases run in WAL mode so an audit can read a shift while the
//! till keeps recording payments. Foreign keys are always on: payments and
//! items must point at a real invoice.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    CashAuditRepository, InvoiceRepository, OrderRepository, ShiftRepository, StoreRepository,
};

/// Where the database lives and how the pool behaves.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created when missing. `None` for a private in-memory
    /// database.
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// A file-backed database with a small pool.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: Some(path.into()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// A throwaway database for tests. Each call yields a separate one.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: None,
            // every connection would see its own empty database
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }
}

/// Handle on the pool. Clones share it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects, migrates and checks the schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let pool = match &config.database_path {
            Some(path) => {
                info!(path = %path.display(), max = config.max_connections, "Opening database");
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .foreign_keys(true);

                SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.acquire_timeout)
                    .connect_with(options)
                    .await
            }
            None => {
                let options = SqliteConnectOptions::new()
                    .in_memory(true)
                    .foreign_keys(true);

                // the database dies with its last connection
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .acquire_timeout(config.acquire_timeout)
                    .connect_with(options)
                    .await
            }
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::migrate(&pool).await?;
        migrations::verify_schema(&pool).await?;

        Ok(Database { pool })
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn stores(&self) -> StoreRepository {
        StoreRepository::new(self.pool.clone())
    }

    pub fn shifts(&self) -> ShiftRepository {
        ShiftRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn cash_audits(&self) -> CashAuditRepository {
        CashAuditRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries and checkpoints the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("INSERT INTO stores (id, name) VALUES ('s-1', 'Centro')")
            .execute(a.pool())
            .await
            .unwrap();

        assert_eq!(a.stores().count().await.unwrap(), 1);
        assert_eq!(b.stores().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let path = std::env::temp_dir().join(format!("comanda-{}.db", uuid::Uuid::new_v4()));

        let db = Database::new(DbConfig::new(&path).max_connections(2)).await.unwrap();
        sqlx::query("INSERT INTO stores (id, name) VALUES ('s-1', 'Centro')")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;

        let reopened = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(reopened.stores().count().await.unwrap(), 1);
        reopened.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[test]
    fn test_pool_size_is_at_least_one() {
        assert_eq!(DbConfig::new("x.db").max_connections(0).max_connections, 1);
        assert_eq!(DbConfig::in_memory().max_connections, 1);
    }
}
