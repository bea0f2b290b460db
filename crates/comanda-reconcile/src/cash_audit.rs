//! # Cash Audit Service
//!
//! Shift reconciliation: compares what the cashier counted with what the
//! system recorded for the store's last shift.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get(store_id, reported)                                                │
//! │       │                                                                 │
//! │       ├── 1. StoreLookup::get_store        → StoreNotFound              │
//! │       ├── 2. ShiftStore::get_last_shift    → ShiftNotFound              │
//! │       ├── 3. OrderLookup::find_by_shift    (invoices + payments)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  audit::assemble_cash_audit()                                           │
//! │       ├── live invoices → totals                                        │
//! │       ├── payments → income::classify_incomes()                         │
//! │       └── reported vs calculated → discrepancies                        │
//! │                                                                         │
//! │  create() = get() + persist, unless an audit exists from the last 24h   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::ReconcileConfig;
use crate::error::{ConfigError, ServiceError, ServiceResult};
use crate::store::{CashAuditStore, OrderLookup, ShiftStore, StoreLookup};
use comanda_core::audit::assemble_cash_audit;
use comanda_core::{CashAudit, CashAuditSummary, CashReport, PaymentCategoryTable, TipBucketing};

/// Reconciliation settings taken from [`ReconcileConfig`].
#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub payment_table: PaymentCategoryTable,
    pub tip_bucketing: TipBucketing,
    pub recent_window: chrono::Duration,
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            payment_table: PaymentCategoryTable::default(),
            tip_bucketing: TipBucketing::default(),
            recent_window: chrono::Duration::hours(24),
        }
    }
}

impl AuditSettings {
    pub fn from_config(config: &ReconcileConfig) -> Result<Self, ConfigError> {
        Ok(AuditSettings {
            payment_table: config.payment_table()?,
            tip_bucketing: config.audit.tip_bucketing,
            recent_window: config.recent_window(),
        })
    }
}

/// Cash audit operations.
#[derive(Debug, Clone)]
pub struct CashAuditService<S> {
    store: S,
    settings: AuditSettings,
}

impl<S> CashAuditService<S>
where
    S: StoreLookup + ShiftStore + OrderLookup + CashAuditStore,
{
    pub fn new(store: S, settings: AuditSettings) -> Self {
        CashAuditService { store, settings }
    }

    /// Computes the audit of the store's last shift without persisting it.
    pub async fn get(&self, store_id: &str, reported: CashReport) -> ServiceResult<CashAudit> {
        let store = self
            .store
            .get_store(store_id)
            .await
            .map_err(ServiceError::StoreLookupFailed)?
            .ok_or_else(|| ServiceError::StoreNotFound(store_id.to_string()))?;

        let shift = self
            .store
            .get_last_shift(store_id)
            .await
            .map_err(ServiceError::ShiftLookupFailed)?
            .ok_or_else(|| ServiceError::ShiftNotFound {
                store_id: store_id.to_string(),
            })?;

        let orders = self
            .store
            .find_by_shift(&shift.id)
            .await
            .map_err(ServiceError::OrdersLookupFailed)?;

        debug!(
            store_id,
            shift_id = %shift.id,
            orders = orders.len(),
            "Reconciling shift"
        );

        let audit = assemble_cash_audit(
            &store,
            &shift,
            &orders,
            reported,
            &self.settings.payment_table,
            self.settings.tip_bucketing,
        );

        if audit.is_balanced() {
            info!(store_id, shift_id = %shift.id, "Shift balanced");
        } else {
            warn!(
                store_id,
                shift_id = %shift.id,
                discrepancies = audit.discrepancies.len(),
                differences = %audit.differences,
                "Shift has discrepancies"
            );
        }

        Ok(audit)
    }

    /// Computes and stores the audit, unless one was stored recently.
    ///
    /// An audit created within the recent window (24 hours by default) is
    /// returned as is, with the new report ignored.
    pub async fn create(&self, store_id: &str, reported: CashReport) -> ServiceResult<CashAudit> {
        let since = Utc::now()
            .checked_sub_signed(self.settings.recent_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        if let Some(existing) = self.store.get_recent_audit(store_id, since).await? {
            info!(
                store_id,
                audit_id = existing.id.as_deref().unwrap_or_default(),
                "Returning recent cash audit"
            );
            return Ok(existing);
        }

        let audit = self.get(store_id, reported).await?;
        Ok(self.store.create_audit(&audit).await?)
    }

    /// Marks a stored audit as confirmed.
    ///
    /// `observations` replaces the stored note when given.
    pub async fn confirm(
        &self,
        audit_id: &str,
        observations: Option<String>,
    ) -> ServiceResult<CashAudit> {
        let mut audit = self
            .store
            .get_audit(audit_id)
            .await?
            .ok_or_else(|| ServiceError::CashAuditNotFound(audit_id.to_string()))?;

        audit.confirmed = true;
        if observations.is_some() {
            audit.observations = observations;
        }
        self.store.update_audit(&audit).await?;

        info!(audit_id, "Cash audit confirmed");
        Ok(audit)
    }

    /// Categorised view of a stored audit.
    pub async fn summary(&self, audit_id: &str) -> ServiceResult<CashAuditSummary> {
        let audit = self
            .store
            .get_audit(audit_id)
            .await?
            .ok_or_else(|| ServiceError::CashAuditNotFound(audit_id.to_string()))?;

        Ok(CashAuditSummary::from(&audit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;
    use comanda_core::invoice::{build_invoice, InvoiceParams};
    use comanda_core::{
        DiscrepancyKind, ErrorKind, IncomeType, Item, Money, Order, OrderStatus, Payment, Shift,
        Store,
    };

    fn store() -> Store {
        Store {
            id: "store-1".to_string(),
            name: "Centro".to_string(),
            operations_center_code: Some("OC-1".to_string()),
            warehouse_code: None,
        }
    }

    fn shift(id: &str, hours_ago: i64) -> Shift {
        Shift {
            id: id.to_string(),
            store_id: "store-1".to_string(),
            account_id: None,
            start_time: Utc::now() - Duration::hours(hours_ago),
            end_time: None,
            start_balance: Money::from_units(100_000),
            end_balance: Money::zero(),
        }
    }

    /// One order of 10,800 (tax included) paid with `method`, with `tip` on top.
    fn paid_order(id: &str, shift_id: &str, method: &str, tip: i64) -> Order {
        let mut invoice = build_invoice(InvoiceParams {
            order_id: Some(id.to_string()),
            store_id: "store-1".to_string(),
            brand_id: "brand-1".to_string(),
            channel_id: "dine-in".to_string(),
            items: vec![Item {
                id: format!("{id}-item"),
                product_id: None,
                name: "Menu del dia".to_string(),
                sku: "MDD".to_string(),
                price: Money::from_units(10_800),
                description: None,
                comments: None,
            }],
            ..InvoiceParams::default()
        })
        .unwrap();
        invoice.payments.push(Payment::new(
            &invoice.id,
            method,
            Money::from_units(10_800),
            Money::from_units(tip),
        ));

        Order {
            id: id.to_string(),
            store_id: "store-1".to_string(),
            brand_id: "brand-1".to_string(),
            channel_id: "dine-in".to_string(),
            table_id: None,
            shift_id: Some(shift_id.to_string()),
            seats: 2,
            current_status: OrderStatus::Closed,
            items: Vec::new(),
            invoices: vec![invoice],
            created_at: Utc::now(),
        }
    }

    async fn setup() -> MemoryStore {
        let memory = MemoryStore::new();
        memory.put_store(store()).await;
        memory.put_shift(shift("shift-old", 30)).await;
        memory.put_shift(shift("shift-1", 4)).await;
        memory.put_order(paid_order("o-old", "shift-old", "cash", 0)).await;
        memory.put_order(paid_order("o-1", "shift-1", "cash", 1_000)).await;
        memory.put_order(paid_order("o-2", "shift-1", "card_visa", 0)).await;
        memory.put_order(paid_order("o-3", "shift-1", "yuno", 500)).await;
        memory
    }

    fn matching_report() -> CashReport {
        CashReport {
            tips: Money::from_units(1_500),
            total_sell: Money::from_units(32_400),
            cash: Money::from_units(11_800),
            online: Money::from_units(11_300),
            card: Money::from_units(10_800),
        }
    }

    #[tokio::test]
    async fn test_get_balanced_shift() {
        let service = CashAuditService::new(setup().await, AuditSettings::default());

        let audit = service.get("store-1", matching_report()).await.unwrap();

        assert_eq!(audit.shift_id, "shift-1");
        assert_eq!(audit.orders, 3);
        assert_eq!(audit.eaters, 6);
        assert_eq!(audit.orders_closed, 3);
        assert_eq!(audit.total_sell.units(), 32_400);
        assert_eq!(audit.total_tips.units(), 1_500);
        assert!(audit.is_balanced(), "{}", audit.differences);
        assert!(audit.differences.is_empty());
        assert!(audit.id.is_none());
    }

    #[tokio::test]
    async fn test_get_reports_discrepancies() {
        let service = CashAuditService::new(setup().await, AuditSettings::default());

        let mut reported = matching_report();
        reported.cash = Money::from_units(11_780);
        let audit = service.get("store-1", reported).await.unwrap();

        assert_eq!(audit.discrepancies.len(), 1);
        assert_eq!(audit.discrepancies[0].kind, DiscrepancyKind::Cash);
        assert_eq!(audit.discrepancies[0].difference().units(), -20);
        assert!(audit.differences.starts_with("IncomeDiscrepancyCash"));
    }

    #[tokio::test]
    async fn test_tip_bucketing_by_method() {
        let settings = AuditSettings {
            tip_bucketing: TipBucketing::ByPaymentMethod,
            ..AuditSettings::default()
        };
        let service = CashAuditService::new(setup().await, settings);

        let audit = service.get("store-1", matching_report()).await.unwrap();
        let tip_origins: Vec<&str> = audit
            .incomes
            .iter()
            .filter(|i| i.kind == IncomeType::Tip)
            .map(|i| i.origin.as_str())
            .collect();

        assert_eq!(tip_origins, vec!["cash", "yuno"]);
        assert!(audit.is_balanced());
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let memory = MemoryStore::new();
        let service = CashAuditService::new(memory.clone(), AuditSettings::default());

        let err = service.get("store-1", CashReport::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::StoreNotFound(_)));

        memory.put_store(store()).await;
        let err = service.get("store-1", CashReport::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::ShiftNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        memory.fail_lookups().await;
        let err = service.get("store-1", CashReport::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::StoreLookupFailed(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_create_reuses_recent_audit() {
        let memory = setup().await;
        let service = CashAuditService::new(memory.clone(), AuditSettings::default());

        let first = service.create("store-1", matching_report()).await.unwrap();
        assert!(first.id.is_some());

        let second = service.create("store-1", CashReport::default()).await.unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.is_balanced());
        assert_eq!(memory.audit_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_after_window() {
        let memory = setup().await;
        let mut stale = service_audit(&memory).await;
        stale.id = Some("old-audit".to_string());
        stale.created_at = Utc::now() - Duration::hours(25);
        memory.put_audit(stale).await;

        let service = CashAuditService::new(memory.clone(), AuditSettings::default());
        let fresh = service.create("store-1", matching_report()).await.unwrap();

        assert_ne!(fresh.id.as_deref(), Some("old-audit"));
        assert_eq!(memory.audit_count().await, 2);
    }

    async fn service_audit(memory: &MemoryStore) -> CashAudit {
        CashAuditService::new(memory.clone(), AuditSettings::default())
            .get("store-1", CashReport::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_confirm_and_summary() {
        let service = CashAuditService::new(setup().await, AuditSettings::default());
        let audit = service.create("store-1", matching_report()).await.unwrap();
        let id = audit.id.clone().unwrap();

        let confirmed = service
            .confirm(&id, Some("counted by manager".to_string()))
            .await
            .unwrap();
        assert!(confirmed.confirmed);
        assert_eq!(confirmed.observations.as_deref(), Some("counted by manager"));

        let summary = service.summary(&id).await.unwrap();
        assert_eq!(summary.cash.units(), 11_800);
        assert_eq!(summary.tips.units(), 1_500);
        assert_eq!(summary.cards.len(), 1);
        assert_eq!(summary.others.len(), 1);

        let err = service.confirm("missing", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::CashAuditNotFound(_)));
    }
}
