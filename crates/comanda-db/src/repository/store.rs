//! # Store Repository
//!
//! Lookup of restaurant locations.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use comanda_core::Store;

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: String,
    name: String,
    operations_center_code: Option<String>,
    warehouse_code: Option<String>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Store {
            id: row.id,
            name: row.name,
            operations_center_code: row.operations_center_code,
            warehouse_code: row.warehouse_code,
        }
    }
}

/// Repository for store database operations.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    /// Creates a new StoreRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Gets a store by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Store>> {
        let row = sqlx::query_as::<_, StoreRow>(
            r#"
            SELECT id, name, operations_center_code, warehouse_code
            FROM stores
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Store::from))
    }

    /// Inserts a store.
    pub async fn insert(&self, store: &Store) -> DbResult<()> {
        debug!(id = %store.id, name = %store.name, "Inserting store");

        sqlx::query(
            r#"
            INSERT INTO stores (id, name, operations_center_code, warehouse_code)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.operations_center_code)
        .bind(&store.warehouse_code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts stores (used by the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_get_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = Store {
            id: "store-1".to_string(),
            name: "Centro".to_string(),
            operations_center_code: Some("OC-01".to_string()),
            warehouse_code: None,
        };

        db.stores().insert(&store).await.unwrap();

        assert_eq!(db.stores().get_by_id("store-1").await.unwrap(), Some(store.clone()));
        assert_eq!(db.stores().get_by_id("nope").await.unwrap(), None);
        assert_eq!(db.stores().count().await.unwrap(), 1);

        let err = db.stores().insert(&store).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
