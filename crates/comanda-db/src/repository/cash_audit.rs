//! # Cash Audit Repository
//!
//! Persisted shift reconciliations.
//!
//! The full [`CashAudit`] is stored as a JSON payload. `store_id`,
//! `shift_id`, `confirmed`, `observations` and `created_at` are also kept
//! in columns for querying; the columns win over the payload when loading.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use comanda_core::CashAudit;

#[derive(Debug, sqlx::FromRow)]
struct CashAuditRow {
    id: String,
    payload: String,
    confirmed: bool,
    observations: Option<String>,
    created_at: DateTime<Utc>,
}

impl CashAuditRow {
    fn into_audit(self) -> DbResult<CashAudit> {
        let mut audit: CashAudit = serde_json::from_str(&self.payload)?;
        audit.id = Some(self.id);
        audit.confirmed = self.confirmed;
        audit.observations = self.observations;
        audit.created_at = self.created_at;
        Ok(audit)
    }
}

const SELECT_AUDIT: &str = r#"
    SELECT id, payload, confirmed, observations, created_at
    FROM cash_audits
"#;

/// Repository for cash audit database operations.
#[derive(Debug, Clone)]
pub struct CashAuditRepository {
    pool: SqlitePool,
}

impl CashAuditRepository {
    /// Creates a new CashAuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashAuditRepository { pool }
    }

    /// Stores an audit and returns it with its assigned id.
    pub async fn insert(&self, audit: &CashAudit) -> DbResult<CashAudit> {
        let mut stored = audit.clone();
        let id = stored
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        stored.id = Some(id.clone());

        let payload = serde_json::to_string(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO cash_audits (
                id, store_id, shift_id, payload, confirmed, observations, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(&stored.store_id)
        .bind(&stored.shift_id)
        .bind(&payload)
        .bind(stored.confirmed)
        .bind(&stored.observations)
        .bind(stored.created_at)
        .execute(&self.pool)
        .await?;

        info!(
            id = %id,
            store_id = %stored.store_id,
            shift_id = %stored.shift_id,
            discrepancies = stored.discrepancies.len(),
            "Cash audit stored"
        );

        Ok(stored)
    }

    /// Gets an audit by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashAudit>> {
        let row = sqlx::query_as::<_, CashAuditRow>(&format!("{SELECT_AUDIT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CashAuditRow::into_audit).transpose()
    }

    /// Gets the store's most recent audit.
    pub async fn latest_for_store(&self, store_id: &str) -> DbResult<Option<CashAudit>> {
        let row = sqlx::query_as::<_, CashAuditRow>(&format!(
            "{SELECT_AUDIT} WHERE store_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ))
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CashAuditRow::into_audit).transpose()
    }

    /// Rewrites a persisted audit, payload included.
    pub async fn update(&self, audit: &CashAudit) -> DbResult<()> {
        let id = audit
            .id
            .as_deref()
            .ok_or_else(|| DbError::Internal("cannot update an unsaved cash audit".to_string()))?;
        debug!(id = %id, confirmed = audit.confirmed, "Updating cash audit");

        let payload = serde_json::to_string(audit)?;
        let result = sqlx::query(
            r#"
            UPDATE cash_audits SET
                payload = ?2,
                confirmed = ?3,
                observations = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&payload)
        .bind(audit.confirmed)
        .bind(&audit.observations)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashAudit", id));
        }

        Ok(())
    }
}
