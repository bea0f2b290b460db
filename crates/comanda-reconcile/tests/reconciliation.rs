//! End-to-end reconciliation against an in-memory SQLite database.

use chrono::Utc;
use comanda_core::{
    CashReport, DiscrepancyKind, ErrorKind, IncomeType, Money, Order, OrderItem,
    OrderItemModifier, OrderStatus, PaymentStatus, Store, TaxRate,
};
use comanda_db::{Database, DbConfig};
use comanda_reconcile::{
    AuditSettings, CashAuditService, CheckoutRequest, InvoiceService, InvoiceStore, ServiceError,
    ShiftService, StoreError,
};

const STORE: &str = "store-1";

async fn database() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    db.stores()
        .insert(&Store {
            id: STORE.to_string(),
            name: "Comanda Centro".to_string(),
            operations_center_code: Some("OC-001".to_string()),
            warehouse_code: Some("WH-001".to_string()),
        })
        .await
        .unwrap();
    db
}

fn order(id: &str, shift_id: &str, lines: &[(&str, i64)]) -> Order {
    Order {
        id: id.to_string(),
        store_id: STORE.to_string(),
        brand_id: "brand-1".to_string(),
        channel_id: "dine-in".to_string(),
        table_id: Some("T1".to_string()),
        shift_id: Some(shift_id.to_string()),
        seats: lines.len() as u32,
        current_status: OrderStatus::Delivered,
        items: lines
            .iter()
            .enumerate()
            .map(|(n, (name, price))| OrderItem {
                id: format!("{id}-{n}"),
                product_id: None,
                name: name.to_string(),
                sku: name.to_uppercase(),
                price: Money::from_units(*price),
                description: None,
                comments: None,
                modifiers: Vec::new(),
            })
            .collect(),
        invoices: Vec::new(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_full_shift_reconciliation() {
    let db = database().await;
    let shifts = ShiftService::new(db.clone());
    let invoices = InvoiceService::new(db.clone(), TaxRate::default());
    let audits = CashAuditService::new(db.clone(), AuditSettings::default());

    let shift = shifts
        .open(STORE, Some("cashier-1"), Money::from_units(100_000))
        .await
        .unwrap();

    // Table 1: one dish, 10% tip, paid cash.
    db.orders()
        .insert(&order("o-1", &shift.id, &[("steak", 10_800)]))
        .await
        .unwrap();
    let inv1 = invoices.checkout("o-1", CheckoutRequest::default()).await.unwrap();
    let inv1 = invoices.set_tip_percentage(&inv1.id, 1000).await.unwrap();
    assert_eq!(inv1.base_tax.units(), 10_000);
    assert_eq!(inv1.tip_amount.units(), 1_000);
    assert_eq!(inv1.total.units(), 11_800);
    invoices
        .record_payment(&inv1.id, "cash", Money::from_units(10_800), inv1.tip_amount)
        .await
        .unwrap();

    // Table 2: two guests split the bill, one pays card, one pays online.
    db.orders()
        .insert(&order("o-2", &shift.id, &[("pasta", 5_400), ("salad", 3_240)]))
        .await
        .unwrap();
    let inv2 = invoices.checkout("o-2", CheckoutRequest::default()).await.unwrap();
    let groups: Vec<Vec<String>> = inv2.items.iter().map(|i| vec![i.id.clone()]).collect();
    let parts = invoices.split(&inv2.id, &groups).await.unwrap();
    assert_eq!(parts.len(), 2);
    invoices
        .record_payment(&parts[0].id, "card_visa", parts[0].total, Money::zero())
        .await
        .unwrap();
    invoices
        .record_payment(&parts[1].id, "yuno", parts[1].total, Money::from_units(300))
        .await
        .unwrap();

    // The retired original no longer counts.
    let err = invoices.get(&inv2.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvoiceNotFound(_)));

    db.orders().update_status("o-1", OrderStatus::Closed).await.unwrap();
    shifts.close(STORE, Money::from_units(111_800)).await.unwrap();

    let reported = CashReport {
        tips: Money::from_units(1_300),
        total_sell: Money::from_units(19_440),
        cash: Money::from_units(11_800),
        online: Money::from_units(3_540),
        card: Money::from_units(5_400),
    };
    let audit = audits.create(STORE, reported).await.unwrap();

    assert_eq!(audit.shift_id, shift.id);
    assert_eq!(audit.orders, 2);
    assert_eq!(audit.eaters, 3);
    assert_eq!(audit.orders_closed, 1);
    assert_eq!(audit.total_sell.units(), 19_440);
    assert_eq!(audit.total_tips.units(), 1_300);
    assert!(audit.is_balanced(), "{}", audit.differences);

    let tip_income: Money = audit
        .incomes
        .iter()
        .filter(|i| i.kind == IncomeType::Tip)
        .map(|i| i.income)
        .sum();
    assert_eq!(tip_income.units(), 1_300);

    // Stored and confirmable.
    let id = audit.id.clone().unwrap();
    let confirmed = audits.confirm(&id, Some("ok".to_string())).await.unwrap();
    assert!(confirmed.confirmed);
    let summary = audits.summary(&id).await.unwrap();
    assert_eq!(summary.cash.units(), 11_800);
}

#[tokio::test]
async fn test_discrepancy_report() {
    let db = database().await;
    let shifts = ShiftService::new(db.clone());
    let invoices = InvoiceService::new(db.clone(), TaxRate::default());
    let audits = CashAuditService::new(db.clone(), AuditSettings::default());

    let shift = shifts.open(STORE, None, Money::zero()).await.unwrap();
    db.orders()
        .insert(&order("o-1", &shift.id, &[("soup", 500)]))
        .await
        .unwrap();
    let inv = invoices.checkout("o-1", CheckoutRequest::default()).await.unwrap();
    invoices
        .record_payment(&inv.id, "cash", Money::from_units(500), Money::zero())
        .await
        .unwrap();
    // Unknown methods are counted as untracked, not rejected.
    invoices
        .record_payment(&inv.id, "giftcard", Money::from_units(70), Money::zero())
        .await
        .unwrap();

    let reported = CashReport {
        total_sell: Money::from_units(500),
        cash: Money::from_units(480),
        ..CashReport::default()
    };
    let audit = audits.get(STORE, reported).await.unwrap();

    assert_eq!(audit.discrepancies.len(), 1);
    assert_eq!(audit.discrepancies[0].kind, DiscrepancyKind::Cash);
    assert_eq!(audit.discrepancies[0].reported.units(), 480);
    assert_eq!(audit.discrepancies[0].calculated.units(), 500);
    assert!(audit.differences.contains("IncomeDiscrepancyCash"));
    assert!(audit
        .incomes
        .iter()
        .any(|i| i.origin == "untracked" && i.income.units() == 70));

    // get() never writes
    assert!(db.cash_audits().latest_for_store(STORE).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stale_invoice_write_conflicts() {
    let db = database().await;
    let shifts = ShiftService::new(db.clone());
    let invoices = InvoiceService::new(db.clone(), TaxRate::default());

    let shift = shifts.open(STORE, None, Money::zero()).await.unwrap();
    let mut with_modifier = order("o-1", &shift.id, &[("burger", 25_000)]);
    with_modifier.items[0].modifiers.push(OrderItemModifier {
        product_id: None,
        name: "Bacon".to_string(),
        sku: "BCN".to_string(),
        price: Money::from_units(4_000),
        comments: None,
    });
    db.orders().insert(&with_modifier).await.unwrap();

    let inv = invoices.checkout("o-1", CheckoutRequest::default()).await.unwrap();
    assert_eq!(inv.items.len(), 2);
    assert_eq!(inv.subtotal.units(), 29_000);

    // A second writer read the invoice before our tip update landed.
    let stale = db.get_invoice(&inv.id).await.unwrap().unwrap();
    invoices.set_tip_percentage(&inv.id, 500).await.unwrap();

    let err = db.update_invoice(&stale).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    let err = ServiceError::from(err);
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // The winning write is intact.
    let current = invoices.get(&inv.id).await.unwrap();
    assert_eq!(current.version, 1);
    assert!(current.tip_amount.is_positive());
}

#[tokio::test]
async fn test_split_of_stale_invoice_changes_nothing() {
    let db = database().await;
    let shifts = ShiftService::new(db.clone());
    let invoices = InvoiceService::new(db.clone(), TaxRate::default());

    let shift = shifts.open(STORE, None, Money::zero()).await.unwrap();
    db.orders()
        .insert(&order("o-1", &shift.id, &[("a", 1_000), ("b", 2_000), ("c", 3_000)]))
        .await
        .unwrap();
    let inv = invoices.checkout("o-1", CheckoutRequest::default()).await.unwrap();

    let plan = comanda_core::split::plan_split(
        &inv,
        &[vec![inv.items[0].id.clone()]],
        TaxRate::default(),
    )
    .unwrap();
    invoices.attach_client(&inv.id, "client-1").await.unwrap();

    let err = db.apply_split(&plan).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let current = invoices.get(&inv.id).await.unwrap();
    assert_eq!(current.items.len(), 3);
    assert_eq!(current.client_id.as_deref(), Some("client-1"));
}

#[tokio::test]
async fn test_paid_invoice_keeps_its_cash_in_the_audit() {
    let db = database().await;
    let shifts = ShiftService::new(db.clone());
    let invoices = InvoiceService::new(db.clone(), TaxRate::default());
    let audits = CashAuditService::new(db.clone(), AuditSettings::default());

    let shift = shifts.open(STORE, None, Money::zero()).await.unwrap();
    db.orders()
        .insert(&order("o-1", &shift.id, &[("steak", 6_000), ("wine", 4_800)]))
        .await
        .unwrap();
    let inv = invoices.checkout("o-1", CheckoutRequest::default()).await.unwrap();
    let payment = invoices
        .record_payment(&inv.id, "cash", Money::from_units(10_800), Money::zero())
        .await
        .unwrap();
    invoices.mark_payment_paid(&payment.id).await.unwrap();

    let before = audits.get(STORE, CashReport::default()).await.unwrap();
    assert_eq!(before.calculated.cash.units(), 10_800);

    let groups: Vec<Vec<String>> = inv.items.iter().map(|i| vec![i.id.clone()]).collect();
    let err = invoices.split(&inv.id, &groups).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let after = audits.get(STORE, CashReport::default()).await.unwrap();
    assert_eq!(after.calculated.cash, before.calculated.cash);
    assert_eq!(after.total_sell.units(), 10_800);

    let stored = db.invoices().get_payment(&payment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Paid);
}
