//! # Invoice Repository
//!
//! Database operations for invoices, their items, adjustments and payments.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert()       invoice + items + adjustments + payments   (1 tx)       │
//! │                                                                         │
//! │  update()       totals, client, adjustments                (1 tx)       │
//! │                 WHERE id = ? AND version = ?  → version + 1             │
//! │                 0 rows → Conflict (or NotFound)                         │
//! │                                                                         │
//! │  apply_split()  original updated or retired (versioned)    (1 tx)       │
//! │                 parts inserted                                          │
//! │                 items re-parented                                       │
//! │                 any failure → rollback, nothing changes                 │
//! │                                                                         │
//! │  update_payment_status()  WHERE status = 'pending' only                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use comanda_core::split::SplitPlan;
use comanda_core::{
    AdjustmentValue, AppliedAdjustment, Invoice, Item, Money, Payment, PaymentStatus, TipKind,
};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    order_id: Option<String>,
    store_id: String,
    brand_id: String,
    channel_id: String,
    table_id: Option<String>,
    client_id: Option<String>,
    shift_id: Option<String>,
    subtotal: i64,
    total_discounts: i64,
    total_surcharges: i64,
    tip_kind: Option<TipKind>,
    tip_amount: i64,
    base_tax: i64,
    taxes: i64,
    total: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    product_id: Option<String>,
    name: String,
    sku: String,
    price: i64,
    description: Option<String>,
    comments: Option<String>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            sku: row.sku,
            price: Money::from_units(row.price),
            description: row.description,
            comments: row.comments,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdjustmentRow {
    id: String,
    kind: String,
    source_id: Option<String>,
    name: String,
    value_type: String,
    value: i64,
    amount: i64,
}

impl AdjustmentRow {
    fn into_adjustment(self) -> DbResult<AppliedAdjustment> {
        let value = match self.value_type.as_str() {
            "percentage" => AdjustmentValue::Percentage(
                u32::try_from(self.value)
                    .map_err(|_| DbError::Internal(format!("bad percentage on adjustment {}", self.id)))?,
            ),
            "fixed" => AdjustmentValue::Fixed(Money::from_units(self.value)),
            other => {
                return Err(DbError::Internal(format!(
                    "unknown adjustment value type '{other}' on {}",
                    self.id
                )))
            }
        };

        Ok(AppliedAdjustment {
            id: self.id,
            source_id: self.source_id,
            name: self.name,
            value,
            amount: Money::from_units(self.amount),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    invoice_id: String,
    method: String,
    quantity: i64,
    tip: i64,
    total_value: i64,
    status: PaymentStatus,
    code: Option<String>,
    checkout_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            invoice_id: row.invoice_id,
            method: row.method,
            quantity: Money::from_units(row.quantity),
            tip: Money::from_units(row.tip),
            total_value: Money::from_units(row.total_value),
            status: row.status,
            code: row.code,
            checkout_url: row.checkout_url,
            created_at: row.created_at,
        }
    }
}

const SELECT_INVOICE: &str = r#"
    SELECT id, order_id, store_id, brand_id, channel_id, table_id, client_id, shift_id,
           subtotal, total_discounts, total_surcharges, tip_kind, tip_amount,
           base_tax, taxes, total, created_at, updated_at, deleted_at, version
    FROM invoices
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice by ID, retired or not, with all children.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!("{SELECT_INVOICE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    /// Gets every invoice of an order, retired ones included.
    pub async fn find_by_order(&self, order_id: &str) -> DbResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "{SELECT_INVOICE} WHERE order_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            invoices.push(self.load(row).await?);
        }
        Ok(invoices)
    }

    /// Inserts an invoice with items, adjustments and payments.
    pub async fn insert(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, total = %invoice.total, "Inserting invoice");

        let mut tx = self.pool.begin().await?;
        insert_invoice(&mut *tx, invoice).await?;
        for payment in &invoice.payments {
            insert_payment(&mut *tx, payment).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Persists totals, tip, client and adjustments of an invoice.
    ///
    /// Succeeds only if the stored version still equals `invoice.version`.
    /// Returns the invoice with its bumped version.
    pub async fn update(&self, invoice: &Invoice) -> DbResult<Invoice> {
        debug!(id = %invoice.id, version = invoice.version, "Updating invoice");

        let mut tx = self.pool.begin().await?;
        let updated_at = update_invoice(&mut *tx, invoice).await?;
        replace_adjustments(&mut *tx, invoice).await?;
        tx.commit().await?;

        let mut updated = invoice.clone();
        updated.version += 1;
        updated.updated_at = updated_at;
        Ok(updated)
    }

    /// Commits a split plan atomically.
    ///
    /// ## What This Does
    /// 1. Updates or retires the original (version checked)
    /// 2. Inserts each part with its adjustments
    /// 3. Re-parents every moved item from the original to its part
    ///
    /// Everything runs in one transaction. On any error the transaction is
    /// dropped and SQLite rolls it back.
    pub async fn apply_split(&self, plan: &SplitPlan) -> DbResult<Vec<Invoice>> {
        let original = &plan.original;
        info!(
            id = %original.id,
            parts = plan.parts.len(),
            fate = ?plan.fate,
            "Applying invoice split"
        );

        let mut tx = self.pool.begin().await?;

        update_invoice(&mut *tx, original).await?;
        replace_adjustments(&mut *tx, original).await?;

        for part in &plan.parts {
            insert_invoice_row(&mut *tx, part).await?;
            insert_adjustments(&mut *tx, part).await?;
        }

        for (item_id, part_id) in plan.moved_items() {
            let moved = sqlx::query(
                "UPDATE invoice_items SET invoice_id = ?1 WHERE id = ?2 AND invoice_id = ?3",
            )
            .bind(part_id)
            .bind(item_id)
            .bind(&original.id)
            .execute(&mut *tx)
            .await?;

            if moved.rows_affected() != 1 {
                return Err(DbError::conflict("Invoice", &original.id, original.version));
            }
        }

        tx.commit().await?;

        Ok(plan.parts.clone())
    }

    /// Records a payment against an invoice.
    pub async fn add_payment(&self, payment: &Payment) -> DbResult<()> {
        debug!(
            invoice_id = %payment.invoice_id,
            method = %payment.method,
            total = %payment.total_value,
            "Recording payment"
        );

        let mut conn = self.pool.acquire().await?;
        insert_payment(&mut *conn, payment).await
    }

    /// Gets a payment by its ID.
    pub async fn get_payment(&self, id: &str) -> DbResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, invoice_id, method, quantity, tip, total_value, status,
                   code, checkout_url, created_at
            FROM payments
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Payment::from))
    }

    /// Settles a pending payment as `payment.status`.
    ///
    /// Only a row still in `pending` is touched; if another writer settled
    /// it first the result is `Conflict`.
    pub async fn update_payment_status(&self, payment: &Payment) -> DbResult<()> {
        debug!(id = %payment.id, status = ?payment.status, "Updating payment status");

        let result = sqlx::query(
            "UPDATE payments SET status = ?2 WHERE id = ?1 AND status = 'pending'",
        )
        .bind(&payment.id)
        .bind(payment.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE id = ?1")
                .bind(&payment.id)
                .fetch_one(&self.pool)
                .await?;

            return Err(if exists == 0 {
                DbError::not_found("Payment", &payment.id)
            } else {
                DbError::conflict("Payment", &payment.id, 0)
            });
        }

        Ok(())
    }

    async fn load(&self, row: InvoiceRow) -> DbResult<Invoice> {
        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, product_id, name, sku, price, description, comments
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY position, id
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let adjustment_rows = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            SELECT id, kind, source_id, name, value_type, value, amount
            FROM invoice_adjustments
            WHERE invoice_id = ?1
            ORDER BY position, id
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let mut discounts = Vec::new();
        let mut surcharges = Vec::new();
        for adjustment in adjustment_rows {
            if adjustment.kind == "discount" {
                discounts.push(adjustment.into_adjustment()?);
            } else {
                surcharges.push(adjustment.into_adjustment()?);
            }
        }

        let payments = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, invoice_id, method, quantity, tip, total_value, status,
                   code, checkout_url, created_at
            FROM payments
            WHERE invoice_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Invoice {
            id: row.id,
            order_id: row.order_id,
            store_id: row.store_id,
            brand_id: row.brand_id,
            channel_id: row.channel_id,
            table_id: row.table_id,
            client_id: row.client_id,
            shift_id: row.shift_id,
            items: items.into_iter().map(Item::from).collect(),
            discounts,
            surcharges,
            subtotal: Money::from_units(row.subtotal),
            total_discounts: Money::from_units(row.total_discounts),
            total_surcharges: Money::from_units(row.total_surcharges),
            tip_kind: row.tip_kind,
            tip_amount: Money::from_units(row.tip_amount),
            base_tax: Money::from_units(row.base_tax),
            taxes: Money::from_units(row.taxes),
            total: Money::from_units(row.total),
            payments: payments.into_iter().map(Payment::from).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            version: row.version,
        })
    }
}

// =============================================================================
// Statement Helpers
// =============================================================================
// Shared by the pool and transaction paths; each takes a plain connection.

async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    insert_invoice_row(conn, invoice).await?;

    for (position, item) in invoice.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, product_id, name, sku, price, description, comments, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&invoice.id)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(&item.sku)
        .bind(item.price.units())
        .bind(&item.description)
        .bind(&item.comments)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }

    insert_adjustments(conn, invoice).await
}

async fn insert_invoice_row(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, order_id, store_id, brand_id, channel_id, table_id, client_id, shift_id,
            subtotal, total_discounts, total_surcharges, tip_kind, tip_amount,
            base_tax, taxes, total, created_at, updated_at, deleted_at, version
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12, ?13,
            ?14, ?15, ?16, ?17, ?18, ?19, ?20
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.order_id)
    .bind(&invoice.store_id)
    .bind(&invoice.brand_id)
    .bind(&invoice.channel_id)
    .bind(&invoice.table_id)
    .bind(&invoice.client_id)
    .bind(&invoice.shift_id)
    .bind(invoice.subtotal.units())
    .bind(invoice.total_discounts.units())
    .bind(invoice.total_surcharges.units())
    .bind(invoice.tip_kind)
    .bind(invoice.tip_amount.units())
    .bind(invoice.base_tax.units())
    .bind(invoice.taxes.units())
    .bind(invoice.total.units())
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .bind(invoice.deleted_at)
    .bind(invoice.version)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_adjustments(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    let tagged = invoice
        .discounts
        .iter()
        .map(|a| ("discount", a))
        .chain(invoice.surcharges.iter().map(|a| ("surcharge", a)));

    for (position, (kind, adjustment)) in tagged.enumerate() {
        let (value_type, value) = match adjustment.value {
            AdjustmentValue::Percentage(bps) => ("percentage", i64::from(bps)),
            AdjustmentValue::Fixed(amount) => ("fixed", amount.units()),
        };

        sqlx::query(
            r#"
            INSERT INTO invoice_adjustments (
                id, invoice_id, kind, source_id, name, value_type, value, amount, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&adjustment.id)
        .bind(&invoice.id)
        .bind(kind)
        .bind(&adjustment.source_id)
        .bind(&adjustment.name)
        .bind(value_type)
        .bind(value)
        .bind(adjustment.amount.units())
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn replace_adjustments(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    sqlx::query("DELETE FROM invoice_adjustments WHERE invoice_id = ?1")
        .bind(&invoice.id)
        .execute(&mut *conn)
        .await?;

    insert_adjustments(conn, invoice).await
}

/// Versioned update of the invoice row itself.
/// Versioned row update. Returns the `updated_at` that was written.
async fn update_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<DateTime<Utc>> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            client_id = ?3,
            subtotal = ?4,
            total_discounts = ?5,
            total_surcharges = ?6,
            tip_kind = ?7,
            tip_amount = ?8,
            base_tax = ?9,
            taxes = ?10,
            total = ?11,
            updated_at = ?12,
            deleted_at = ?13,
            version = version + 1
        WHERE id = ?1 AND version = ?2
        "#,
    )
    .bind(&invoice.id)
    .bind(invoice.version)
    .bind(&invoice.client_id)
    .bind(invoice.subtotal.units())
    .bind(invoice.total_discounts.units())
    .bind(invoice.total_surcharges.units())
    .bind(invoice.tip_kind)
    .bind(invoice.tip_amount.units())
    .bind(invoice.base_tax.units())
    .bind(invoice.taxes.units())
    .bind(invoice.total.units())
    .bind(now)
    .bind(invoice.deleted_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE id = ?1")
            .bind(&invoice.id)
            .fetch_one(&mut *conn)
            .await?;

        return Err(if exists == 0 {
            DbError::not_found("Invoice", &invoice.id)
        } else {
            DbError::conflict("Invoice", &invoice.id, invoice.version)
        });
    }

    Ok(now)
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, invoice_id, method, quantity, tip, total_value, status,
            code, checkout_url, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.invoice_id)
    .bind(&payment.method)
    .bind(payment.quantity.units())
    .bind(payment.tip.units())
    .bind(payment.total_value.units())
    .bind(payment.status)
    .bind(&payment.code)
    .bind(&payment.checkout_url)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::order::tests::setup;
    use comanda_core::invoice::{build_invoice, set_tip_percentage, AdjustmentParams, InvoiceParams};
    use comanda_core::split::{plan_split, OriginalFate};
    use comanda_core::TaxRate;

    fn item(id: &str, price: i64) -> Item {
        Item {
            id: id.to_string(),
            product_id: None,
            name: format!("Dish {id}"),
            sku: format!("SKU-{id}"),
            price: Money::from_units(price),
            description: None,
            comments: None,
        }
    }

    fn invoice() -> Invoice {
        build_invoice(InvoiceParams {
            store_id: "store-1".to_string(),
            brand_id: "brand-1".to_string(),
            channel_id: "dine-in".to_string(),
            items: vec![item("a", 6_000), item("b", 3_000), item("c", 1_800)],
            discounts: vec![AdjustmentParams {
                source_id: Some("promo".to_string()),
                name: "Promo".to_string(),
                value: AdjustmentValue::Fixed(Money::from_units(999)),
            }],
            ..InvoiceParams::default()
        })
        .unwrap()
    }

    fn ids(group: &[&str]) -> Vec<String> {
        group.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_load_invoice() {
        let db = setup().await;
        let mut inv = invoice();
        inv.payments
            .push(Payment::new(&inv.id, "cash", Money::from_units(10_000), Money::from_units(800)));
        db.invoices().insert(&inv).await.unwrap();

        let loaded = db.invoices().get_by_id(&inv.id).await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 3);
        assert_eq!(loaded.discounts, inv.discounts);
        assert_eq!(loaded.total, inv.total);
        assert_eq!(loaded.payments.len(), 1);
        assert_eq!(loaded.payments[0].total_value.units(), 10_800);
        assert_eq!(loaded.version, 0);
    }

    #[tokio::test]
    async fn test_versioned_update_detects_conflict() {
        let db = setup().await;
        let inv = invoice();
        db.invoices().insert(&inv).await.unwrap();

        let mut first = inv.clone();
        set_tip_percentage(&mut first, 1000, TaxRate::default()).unwrap();
        let stored = db.invoices().update(&first).await.unwrap();
        assert_eq!(stored.version, 1);

        // a second writer still holding version 0
        let mut stale = inv.clone();
        set_tip_percentage(&mut stale, 500, TaxRate::default()).unwrap();
        let err = db.invoices().update(&stale).await.unwrap_err();
        assert!(err.is_conflict());

        let loaded = db.invoices().get_by_id(&inv.id).await.unwrap().unwrap();
        assert_eq!(loaded.tip_amount, first.tip_amount);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.updated_at, stored.updated_at);

        let mut ghost = invoice();
        ghost.id = "ghost".to_string();
        let err = db.invoices().update(&ghost).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_apply_split_moves_items() {
        let db = setup().await;
        let inv = invoice();
        db.invoices().insert(&inv).await.unwrap();

        let plan = plan_split(&inv, &[ids(&["a"]), ids(&["b"])], TaxRate::default()).unwrap();
        assert_eq!(plan.fate, OriginalFate::Keep);
        let parts = db.invoices().apply_split(&plan).await.unwrap();

        let original = db.invoices().get_by_id(&inv.id).await.unwrap().unwrap();
        assert!(original.is_live());
        assert_eq!(original.items.len(), 1);
        assert_eq!(original.items[0].id, "c");
        assert_eq!(original.version, 1);

        let mut discount_total = original.total_discounts;
        for part in &parts {
            let stored = db.invoices().get_by_id(&part.id).await.unwrap().unwrap();
            assert_eq!(stored.items.len(), 1);
            assert_eq!(stored.subtotal, part.subtotal);
            discount_total += stored.total_discounts;
        }
        assert_eq!(discount_total.units(), 999);
    }

    #[tokio::test]
    async fn test_apply_split_rolls_back_on_stale_plan() {
        let db = setup().await;
        let inv = invoice();
        db.invoices().insert(&inv).await.unwrap();

        let plan = plan_split(&inv, &[ids(&["a", "b", "c"])], TaxRate::default()).unwrap();
        assert_eq!(plan.fate, OriginalFate::Retire);

        // someone else touched the invoice after the plan was made
        let mut concurrent = inv.clone();
        set_tip_percentage(&mut concurrent, 1000, TaxRate::default()).unwrap();
        db.invoices().update(&concurrent).await.unwrap();

        let err = db.invoices().apply_split(&plan).await.unwrap_err();
        assert!(err.is_conflict());

        let original = db.invoices().get_by_id(&inv.id).await.unwrap().unwrap();
        assert!(original.is_live());
        assert_eq!(original.items.len(), 3);
        assert!(db
            .invoices()
            .get_by_id(&plan.parts[0].id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_exhaustive_split_retires_original() {
        let db = setup().await;
        let inv = invoice();
        db.invoices().insert(&inv).await.unwrap();

        let plan = plan_split(&inv, &[ids(&["a", "c"]), ids(&["b"])], TaxRate::default()).unwrap();
        db.invoices().apply_split(&plan).await.unwrap();

        let original = db.invoices().get_by_id(&inv.id).await.unwrap().unwrap();
        assert!(!original.is_live());
        assert!(original.items.is_empty());
    }

    #[tokio::test]
    async fn test_payment_status_settles_once() {
        let db = setup().await;
        let mut inv = invoice();
        let payment = Payment::new(&inv.id, "card_visa", Money::from_units(9_801), Money::zero());
        inv.payments.push(payment.clone());
        db.invoices().insert(&inv).await.unwrap();

        let mut paid = db.invoices().get_payment(&payment.id).await.unwrap().unwrap();
        assert_eq!(paid.status, PaymentStatus::Pending);
        paid.mark_paid().unwrap();
        db.invoices().update_payment_status(&paid).await.unwrap();

        let loaded = db.invoices().get_payment(&payment.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PaymentStatus::Paid);

        // a second writer that read it while still pending
        let mut late = payment.clone();
        late.cancel().unwrap();
        let err = db.invoices().update_payment_status(&late).await.unwrap_err();
        assert!(err.is_conflict());
        let loaded = db.invoices().get_payment(&payment.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PaymentStatus::Paid);

        let mut ghost = Payment::new(&inv.id, "cash", Money::zero(), Money::zero());
        ghost.cancel().unwrap();
        let err = db.invoices().update_payment_status(&ghost).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        assert!(db.invoices().get_payment("nope").await.unwrap().is_none());
    }
}
