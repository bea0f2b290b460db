//! # Order Repository
//!
//! Database operations for orders, their items and modifiers.
//!
//! Loading an order also loads its invoices (with items, adjustments and
//! payments), which is what the cash audit consumes.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::invoice::InvoiceRepository;
use comanda_core::{Money, Order, OrderItem, OrderItemModifier, OrderStatus};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    store_id: String,
    brand_id: String,
    channel_id: String,
    table_id: Option<String>,
    shift_id: Option<String>,
    seats: i64,
    current_status: OrderStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    product_id: Option<String>,
    name: String,
    sku: String,
    price: i64,
    description: Option<String>,
    comments: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ModifierRow {
    product_id: Option<String>,
    name: String,
    sku: String,
    price: i64,
    comments: Option<String>,
}

impl From<ModifierRow> for OrderItemModifier {
    fn from(row: ModifierRow) -> Self {
        OrderItemModifier {
            product_id: row.product_id,
            name: row.name,
            sku: row.sku,
            price: Money::from_units(row.price),
            comments: row.comments,
        }
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID with items and invoices.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, store_id, brand_id, channel_id, table_id, shift_id,
                   seats, current_status, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    /// Gets every order of a shift, oldest first, with items and invoices.
    pub async fn find_by_shift(&self, shift_id: &str) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, store_id, brand_id, channel_id, table_id, shift_id,
                   seats, current_status, created_at
            FROM orders
            WHERE shift_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(shift_id = %shift_id, count = rows.len(), "Loaded shift orders");

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.load(row).await?);
        }
        Ok(orders)
    }

    /// Inserts an order with its items and modifiers in one transaction.
    ///
    /// Invoices on `order.invoices` are not written here; see
    /// [`InvoiceRepository::insert`].
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, items = order.items.len(), "Inserting order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, store_id, brand_id, channel_id, table_id, shift_id,
                seats, current_status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&order.id)
        .bind(&order.store_id)
        .bind(&order.brand_id)
        .bind(&order.channel_id)
        .bind(&order.table_id)
        .bind(&order.shift_id)
        .bind(i64::from(order.seats))
        .bind(order.current_status)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, name, sku, price, description, comments, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(&item.sku)
            .bind(item.price.units())
            .bind(&item.description)
            .bind(&item.comments)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;

            for modifier in &item.modifiers {
                sqlx::query(
                    r#"
                    INSERT INTO order_item_modifiers (
                        order_item_id, product_id, name, sku, price, comments
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                )
                .bind(&item.id)
                .bind(&modifier.product_id)
                .bind(&modifier.name)
                .bind(&modifier.sku)
                .bind(modifier.price.units())
                .bind(&modifier.comments)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Moves an order to a new status.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET current_status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    async fn load(&self, row: OrderRow) -> DbResult<Order> {
        let seats = u32::try_from(row.seats)
            .map_err(|_| DbError::Internal(format!("bad seat count {} on order {}", row.seats, row.id)))?;
        let items = self.load_items(&row.id).await?;
        let invoices = InvoiceRepository::new(self.pool.clone())
            .find_by_order(&row.id)
            .await?;

        Ok(Order {
            id: row.id,
            store_id: row.store_id,
            brand_id: row.brand_id,
            channel_id: row.channel_id,
            table_id: row.table_id,
            shift_id: row.shift_id,
            seats,
            current_status: row.current_status,
            items,
            invoices,
            created_at: row.created_at,
        })
    }

    async fn load_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, product_id, name, sku, price, description, comments
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let modifiers = sqlx::query_as::<_, ModifierRow>(
                r#"
                SELECT product_id, name, sku, price, comments
                FROM order_item_modifiers
                WHERE order_item_id = ?1
                ORDER BY id
                "#,
            )
            .bind(&row.id)
            .fetch_all(&self.pool)
            .await?;

            items.push(OrderItem {
                id: row.id,
                product_id: row.product_id,
                name: row.name,
                sku: row.sku,
                price: Money::from_units(row.price),
                description: row.description,
                comments: row.comments,
                modifiers: modifiers.into_iter().map(OrderItemModifier::from).collect(),
            });
        }

        Ok(items)
    }
}
