//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary, so the
//! `cash-audit` and `seed` tools can open any database file and bring it to
//! the current schema on their own.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::new()                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  migrate()          applied before: 0   embedded: 1                     │
//! │       │             runs 001_initial_schema.sql                         │
//! │       ▼                                                                 │
//! │  verify_schema()    stores, shifts, orders, invoices, payments,         │
//! │       │             cash_audits must all exist                          │
//! │       ▼                                                                 │
//! │  repositories                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Migration files are append-only. A change to the schema is a new
//! `NNN_description.sql`, never an edit to an applied one.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Tables the reconciliation flow reads or writes.
pub const RECONCILIATION_TABLES: [&str; 6] = [
    "stores",
    "shifts",
    "orders",
    "invoices",
    "payments",
    "cash_audits",
];

/// What a call to [`migrate`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    /// Migrations compiled into this build.
    pub embedded: usize,
    /// Migrations recorded in the database before this run.
    pub applied_before: usize,
}

impl MigrationReport {
    /// Migrations this run applied.
    pub fn newly_applied(&self) -> usize {
        self.embedded.saturating_sub(self.applied_before)
    }
}

/// Brings the database to the embedded schema.
pub async fn migrate(pool: &SqlitePool) -> DbResult<MigrationReport> {
    let applied_before = applied_count(pool).await;
    MIGRATOR.run(pool).await?;

    let report = MigrationReport {
        embedded: MIGRATOR.migrations.len(),
        applied_before,
    };
    info!(
        embedded = report.embedded,
        newly_applied = report.newly_applied(),
        "Schema up to date"
    );
    Ok(report)
}

/// Fails with [`DbError::MigrationFailed`] naming the first missing table.
pub async fn verify_schema(pool: &SqlitePool) -> DbResult<()> {
    for table in RECONCILIATION_TABLES {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if found == 0 {
            return Err(DbError::MigrationFailed(format!("table {table} is missing")));
        }
    }
    debug!("Reconciliation tables present");
    Ok(())
}

/// Rows in `_sqlx_migrations`; a fresh file has no such table yet.
async fn applied_count(pool: &SqlitePool) -> usize {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .map(|n| n as usize)
        .unwrap_or(0)
}
