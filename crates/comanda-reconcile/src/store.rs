//! # Storage Ports
//!
//! Traits the services use to reach storage, and their SQLite
//! implementation on [`comanda_db::Database`].
//!
//! ## Port Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Port             Used by                    comanda-db repository      │
//! │  ─────────────    ─────────────────────────  ─────────────────────────  │
//! │  StoreLookup      CashAudit, Shift           StoreRepository            │
//! │  ShiftStore       CashAudit, Shift           ShiftRepository            │
//! │  OrderLookup      CashAudit, Invoice         OrderRepository            │
//! │  InvoiceStore     Invoice                    InvoiceRepository          │
//! │  CashAuditStore   CashAudit                  CashAuditRepository        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `InvoiceStore::update` and `InvoiceStore::apply_split` are versioned: a
//! stale invoice yields [`StoreError::Conflict`]. Payment status writes are
//! guarded the same way, on `pending` instead of a version.

use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use comanda_core::{CashAudit, Invoice, Order, Payment, Shift, SplitPlan, Store};
use comanda_db::Database;

// =============================================================================
// Ports
// =============================================================================

#[allow(async_fn_in_trait)]
pub trait StoreLookup {
    async fn get_store(&self, id: &str) -> StoreResult<Option<Store>>;
}

#[allow(async_fn_in_trait)]
pub trait ShiftStore {
    /// The store's most recently opened shift, open or closed.
    async fn get_last_shift(&self, store_id: &str) -> StoreResult<Option<Shift>>;

    async fn get_open_shift(&self, store_id: &str) -> StoreResult<Option<Shift>>;

    async fn create_shift(&self, shift: &Shift) -> StoreResult<()>;

    async fn update_shift(&self, shift: &Shift) -> StoreResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait OrderLookup {
    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>>;

    /// Orders of a shift with invoices and payments loaded.
    async fn find_by_shift(&self, shift_id: &str) -> StoreResult<Vec<Order>>;
}

#[allow(async_fn_in_trait)]
pub trait InvoiceStore {
    async fn get_invoice(&self, id: &str) -> StoreResult<Option<Invoice>>;

    async fn create_invoice(&self, invoice: &Invoice) -> StoreResult<()>;

    /// Returns the stored invoice with its new version.
    async fn update_invoice(&self, invoice: &Invoice) -> StoreResult<Invoice>;

    /// Commits every part of the plan or none of it.
    async fn apply_split(&self, plan: &SplitPlan) -> StoreResult<Vec<Invoice>>;

    async fn add_payment(&self, payment: &Payment) -> StoreResult<()>;

    async fn get_payment(&self, id: &str) -> StoreResult<Option<Payment>>;

    /// Writes `payment.status` if the stored payment is still pending;
    /// otherwise [`StoreError::Conflict`].
    async fn update_payment_status(&self, payment: &Payment) -> StoreResult<()>;
}

#[allow(async_fn_in_trait)]
pub trait CashAuditStore {
    /// Stores the audit and returns it with its id.
    async fn create_audit(&self, audit: &CashAudit) -> StoreResult<CashAudit>;

    async fn get_audit(&self, id: &str) -> StoreResult<Option<CashAudit>>;

    /// The store's latest audit if it was created at or after `since`.
    async fn get_recent_audit(
        &self,
        store_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<CashAudit>>;

    async fn update_audit(&self, audit: &CashAudit) -> StoreResult<()>;
}

// =============================================================================
// SQLite Implementation
// =============================================================================

impl StoreLookup for Database {
    async fn get_store(&self, id: &str) -> StoreResult<Option<Store>> {
        Ok(self.stores().get_by_id(id).await?)
    }
}

impl ShiftStore for Database {
    async fn get_last_shift(&self, store_id: &str) -> StoreResult<Option<Shift>> {
        Ok(self.shifts().get_last(store_id).await?)
    }

    async fn get_open_shift(&self, store_id: &str) -> StoreResult<Option<Shift>> {
        Ok(self.shifts().get_open(store_id).await?)
    }

    async fn create_shift(&self, shift: &Shift) -> StoreResult<()> {
        Ok(self.shifts().insert(shift).await?)
    }

    async fn update_shift(&self, shift: &Shift) -> StoreResult<()> {
        Ok(self.shifts().update(shift).await?)
    }
}

impl OrderLookup for Database {
    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(self.orders().get_by_id(id).await?)
    }

    async fn find_by_shift(&self, shift_id: &str) -> StoreResult<Vec<Order>> {
        Ok(self.orders().find_by_shift(shift_id).await?)
    }
}

impl InvoiceStore for Database {
    async fn get_invoice(&self, id: &str) -> StoreResult<Option<Invoice>> {
        Ok(self.invoices().get_by_id(id).await?)
    }

    async fn create_invoice(&self, invoice: &Invoice) -> StoreResult<()> {
        Ok(self.invoices().insert(invoice).await?)
    }

    async fn update_invoice(&self, invoice: &Invoice) -> StoreResult<Invoice> {
        Ok(self.invoices().update(invoice).await?)
    }

    async fn apply_split(&self, plan: &SplitPlan) -> StoreResult<Vec<Invoice>> {
        Ok(self.invoices().apply_split(plan).await?)
    }

    async fn add_payment(&self, payment: &Payment) -> StoreResult<()> {
        Ok(self.invoices().add_payment(payment).await?)
    }

    async fn get_payment(&self, id: &str) -> StoreResult<Option<Payment>> {
        Ok(self.invoices().get_payment(id).await?)
    }

    async fn update_payment_status(&self, payment: &Payment) -> StoreResult<()> {
        Ok(self.invoices().update_payment_status(payment).await?)
    }
}

impl CashAuditStore for Database {
    async fn create_audit(&self, audit: &CashAudit) -> StoreResult<CashAudit> {
        Ok(self.cash_audits().insert(audit).await?)
    }

    async fn get_audit(&self, id: &str) -> StoreResult<Option<CashAudit>> {
        Ok(self.cash_audits().get_by_id(id).await?)
    }

    async fn get_recent_audit(
        &self,
        store_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<CashAudit>> {
        let latest = self.cash_audits().latest_for_store(store_id).await?;
        Ok(latest.filter(|audit| audit.created_at >= since))
    }

    async fn update_audit(&self, audit: &CashAudit) -> StoreResult<()> {
        Ok(self.cash_audits().update(audit).await?)
    }
}

// =============================================================================
// In-Memory Fake
// =============================================================================

#[cfg(test)]
pub(crate) mod memory {
    //! Map-backed ports for service unit tests.
    //!
    //! Mirrors the SQLite semantics the services depend on: versioned
    //! invoice updates, all-or-nothing splits and pending-only payment
    //! settlement.

    use super::*;
    use crate::error::StoreError;
    use comanda_core::PaymentStatus;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Debug, Default)]
    struct Tables {
        stores: HashMap<String, Store>,
        shifts: Vec<Shift>,
        orders: Vec<Order>,
        invoices: HashMap<String, Invoice>,
        audits: Vec<CashAudit>,
        fail_lookups: bool,
    }

    /// Cloneable handle on shared in-memory tables.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryStore {
        tables: Arc<Mutex<Tables>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn put_store(&self, store: Store) {
            self.tables.lock().await.stores.insert(store.id.clone(), store);
        }

        pub async fn put_shift(&self, shift: Shift) {
            self.tables.lock().await.shifts.push(shift);
        }

        /// Stores an order; its invoices become visible through
        /// `get_invoice` as well.
        pub async fn put_order(&self, order: Order) {
            let mut tables = self.tables.lock().await;
            for invoice in &order.invoices {
                tables.invoices.insert(invoice.id.clone(), invoice.clone());
            }
            tables.orders.push(order);
        }

        pub async fn put_audit(&self, audit: CashAudit) {
            self.tables.lock().await.audits.push(audit);
        }

        /// Makes every read fail with a backend error.
        pub async fn fail_lookups(&self) {
            self.tables.lock().await.fail_lookups = true;
        }

        pub async fn audit_count(&self) -> usize {
            self.tables.lock().await.audits.len()
        }

        fn check(tables: &Tables) -> StoreResult<()> {
            if tables.fail_lookups {
                return Err(StoreError::Backend("connection refused".to_string()));
            }
            Ok(())
        }
    }

    impl StoreLookup for MemoryStore {
        async fn get_store(&self, id: &str) -> StoreResult<Option<Store>> {
            let tables = self.tables.lock().await;
            Self::check(&tables)?;
            Ok(tables.stores.get(id).cloned())
        }
    }

    impl ShiftStore for MemoryStore {
        async fn get_last_shift(&self, store_id: &str) -> StoreResult<Option<Shift>> {
            let tables = self.tables.lock().await;
            Self::check(&tables)?;
            Ok(tables
                .shifts
                .iter()
                .filter(|s| s.store_id == store_id)
                .max_by_key(|s| s.start_time)
                .cloned())
        }

        async fn get_open_shift(&self, store_id: &str) -> StoreResult<Option<Shift>> {
            let tables = self.tables.lock().await;
            Self::check(&tables)?;
            Ok(tables
                .shifts
                .iter()
                .filter(|s| s.store_id == store_id && s.is_open())
                .max_by_key(|s| s.start_time)
                .cloned())
        }

        async fn create_shift(&self, shift: &Shift) -> StoreResult<()> {
            self.tables.lock().await.shifts.push(shift.clone());
            Ok(())
        }

        async fn update_shift(&self, shift: &Shift) -> StoreResult<()> {
            let mut tables = self.tables.lock().await;
            let slot = tables
                .shifts
                .iter_mut()
                .find(|s| s.id == shift.id)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "Shift".to_string(),
                    id: shift.id.clone(),
                })?;
            *slot = shift.clone();
            Ok(())
        }
    }

    impl OrderLookup for MemoryStore {
        async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
            let tables = self.tables.lock().await;
            Self::check(&tables)?;
            Ok(tables.orders.iter().find(|o| o.id == id).map(|order| {
                let mut order = order.clone();
                order.invoices = invoices_of(&tables, &order.id);
                order
            }))
        }

        async fn find_by_shift(&self, shift_id: &str) -> StoreResult<Vec<Order>> {
            let tables = self.tables.lock().await;
            Self::check(&tables)?;
            Ok(tables
                .orders
                .iter()
                .filter(|o| o.shift_id.as_deref() == Some(shift_id))
                .map(|order| {
                    let mut order = order.clone();
                    order.invoices = invoices_of(&tables, &order.id);
                    order
                })
                .collect())
        }
    }

    fn invoices_of(tables: &Tables, order_id: &str) -> Vec<Invoice> {
        let mut invoices: Vec<Invoice> = tables
            .invoices
            .values()
            .filter(|i| i.order_id.as_deref() == Some(order_id))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        invoices
    }

    impl InvoiceStore for MemoryStore {
        async fn get_invoice(&self, id: &str) -> StoreResult<Option<Invoice>> {
            let tables = self.tables.lock().await;
            Self::check(&tables)?;
            Ok(tables.invoices.get(id).cloned())
        }

        async fn create_invoice(&self, invoice: &Invoice) -> StoreResult<()> {
            self.tables
                .lock()
                .await
                .invoices
                .insert(invoice.id.clone(), invoice.clone());
            Ok(())
        }

        async fn update_invoice(&self, invoice: &Invoice) -> StoreResult<Invoice> {
            let mut tables = self.tables.lock().await;
            bump_version(&mut tables, invoice)
        }

        async fn apply_split(&self, plan: &SplitPlan) -> StoreResult<Vec<Invoice>> {
            let mut tables = self.tables.lock().await;
            bump_version(&mut tables, &plan.original)?;
            for part in &plan.parts {
                tables.invoices.insert(part.id.clone(), part.clone());
            }
            Ok(plan.parts.clone())
        }

        async fn add_payment(&self, payment: &Payment) -> StoreResult<()> {
            let mut tables = self.tables.lock().await;
            let invoice = tables
                .invoices
                .get_mut(&payment.invoice_id)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "Invoice".to_string(),
                    id: payment.invoice_id.clone(),
                })?;
            invoice.payments.push(payment.clone());
            Ok(())
        }

        async fn get_payment(&self, id: &str) -> StoreResult<Option<Payment>> {
            let tables = self.tables.lock().await;
            Self::check(&tables)?;
            Ok(tables
                .invoices
                .values()
                .flat_map(|invoice| invoice.payments.iter())
                .find(|payment| payment.id == id)
                .cloned())
        }

        async fn update_payment_status(&self, payment: &Payment) -> StoreResult<()> {
            let mut tables = self.tables.lock().await;
            let stored = tables
                .invoices
                .get_mut(&payment.invoice_id)
                .and_then(|invoice| invoice.payments.iter_mut().find(|p| p.id == payment.id))
                .ok_or_else(|| StoreError::NotFound {
                    entity: "Payment".to_string(),
                    id: payment.id.clone(),
                })?;
            if stored.status != PaymentStatus::Pending {
                return Err(StoreError::Conflict {
                    entity: "Payment".to_string(),
                    id: payment.id.clone(),
                });
            }
            stored.status = payment.status;
            Ok(())
        }
    }

    fn bump_version(tables: &mut Tables, invoice: &Invoice) -> StoreResult<Invoice> {
        let stored = tables
            .invoices
            .get_mut(&invoice.id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Invoice".to_string(),
                id: invoice.id.clone(),
            })?;

        if stored.version != invoice.version {
            return Err(StoreError::Conflict {
                entity: "Invoice".to_string(),
                id: invoice.id.clone(),
            });
        }

        let mut updated = invoice.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    impl CashAuditStore for MemoryStore {
        async fn create_audit(&self, audit: &CashAudit) -> StoreResult<CashAudit> {
            let mut stored = audit.clone();
            stored.id = Some(uuid::Uuid::new_v4().to_string());
            self.tables.lock().await.audits.push(stored.clone());
            Ok(stored)
        }

        async fn get_audit(&self, id: &str) -> StoreResult<Option<CashAudit>> {
            let tables = self.tables.lock().await;
            Ok(tables
                .audits
                .iter()
                .find(|a| a.id.as_deref() == Some(id))
                .cloned())
        }

        async fn get_recent_audit(
            &self,
            store_id: &str,
            since: DateTime<Utc>,
        ) -> StoreResult<Option<CashAudit>> {
            let tables = self.tables.lock().await;
            Ok(tables
                .audits
                .iter()
                .filter(|a| a.store_id == store_id && a.created_at >= since)
                .max_by_key(|a| a.created_at)
                .cloned())
        }

        async fn update_audit(&self, audit: &CashAudit) -> StoreResult<()> {
            let mut tables = self.tables.lock().await;
            let slot = tables
                .audits
                .iter_mut()
                .find(|a| a.id.is_some() && a.id == audit.id)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "CashAudit".to_string(),
                    id: audit.id.clone().unwrap_or_default(),
                })?;
            *slot = audit.clone();
            Ok(())
        }
    }
}
