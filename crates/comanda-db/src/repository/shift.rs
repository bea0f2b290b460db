//! # Shift Repository
//!
//! Database operations for cashier shifts.
//!
//! ## Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. OPEN   insert() → Shift { end_time: None }                          │
//! │  2. SELL   orders reference the shift                                   │
//! │  3. CLOSE  update() → Shift { end_time: Some(..), end_balance }         │
//! │  4. AUDIT  get_last() feeds the cash audit                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use comanda_core::{Money, Shift};

#[derive(Debug, sqlx::FromRow)]
struct ShiftRow {
    id: String,
    store_id: String,
    account_id: Option<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    start_balance: i64,
    end_balance: i64,
}

impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        Shift {
            id: row.id,
            store_id: row.store_id,
            account_id: row.account_id,
            start_time: row.start_time,
            end_time: row.end_time,
            start_balance: Money::from_units(row.start_balance),
            end_balance: Money::from_units(row.end_balance),
        }
    }
}

const SELECT_SHIFT: &str = r#"
    SELECT id, store_id, account_id, start_time, end_time, start_balance, end_balance
    FROM shifts
"#;

/// Repository for shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let row = sqlx::query_as::<_, ShiftRow>(&format!("{SELECT_SHIFT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Shift::from))
    }

    /// Gets the store's most recently opened shift, open or closed.
    pub async fn get_last(&self, store_id: &str) -> DbResult<Option<Shift>> {
        let row = sqlx::query_as::<_, ShiftRow>(&format!(
            "{SELECT_SHIFT} WHERE store_id = ?1 ORDER BY start_time DESC, rowid DESC LIMIT 1"
        ))
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Shift::from))
    }

    /// Gets the store's open shift, if any.
    pub async fn get_open(&self, store_id: &str) -> DbResult<Option<Shift>> {
        let row = sqlx::query_as::<_, ShiftRow>(&format!(
            "{SELECT_SHIFT} WHERE store_id = ?1 AND end_time IS NULL \
             ORDER BY start_time DESC, rowid DESC LIMIT 1"
        ))
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Shift::from))
    }

    /// Inserts a shift.
    pub async fn insert(&self, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, store_id = %shift.store_id, "Opening shift");

        sqlx::query(
            r#"
            INSERT INTO shifts (
                id, store_id, account_id, start_time, end_time, start_balance, end_balance
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.store_id)
        .bind(&shift.account_id)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.start_balance.units())
        .bind(shift.end_balance.units())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the closing fields of a shift.
    pub async fn update(&self, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, end_balance = %shift.end_balance, "Updating shift");

        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                account_id = ?2,
                end_time = ?3,
                end_balance = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.account_id)
        .bind(shift.end_time)
        .bind(shift.end_balance.units())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shift", &shift.id));
        }

        Ok(())
    }
}
